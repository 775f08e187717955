//! `ruby` 빌드 대상 규칙 팩
//!
//! 야간 빌드 로그용 규칙입니다.
//!
//! - title hook: `svn-info/ruby`(리비전), `configure`(대상 시스템), `miniversion`/`version`
//!   (버전 문자열), 로그 전체(이상 마크)
//! - failure hook: `btest`, `test-knownbug`, `test.rb`, `test-all`, `rubyspec`
//! - diff 전처리: 릴리스 날짜, 버전 배너, 경고 줄 번호, 경과 시간, 주소, pid, 포트, 임시 경로,
//!   다이제스트, 리비전 번호 등 실행마다 바뀌는 값
//! - 정렬: 테스트별 시간 줄, rubyspec 심볼 줄

use regex::{Captures, Regex};

use chklog_core::config::MarkConfig;
use chklog_core::types::{FailureOutcome, TitleField};

use crate::error::CanonError;
use crate::extract::MarkCounter;
use crate::rule::{ActionError, RuleAction, RuleRegistry};

/// 프로젝트 이름
pub const PROJECT: &str = "ruby";

/// 버전 접미어에서 제외하는 변형 이름
const VERSION_SUFFIX_SKIP: [&str; 2] = ["trunk", "1.8"];

/// XSD dateTime 숫자 자리에 차례로 붙이는 이름
const DATETIME_PARTS: [&str; 7] = ["Y", "M", "D", "h", "m", "s", "s"];

/// 규칙을 모두 설치합니다.
pub fn install(registry: &mut RuleRegistry, mark: &MarkConfig) -> Result<(), CanonError> {
    install_title_hooks(registry, mark)?;
    install_failure_hooks(registry)?;
    install_rewrites(registry)?;
    install_sorts(registry)?;
    Ok(())
}

// --- title hooks ---

fn install_title_hooks(registry: &mut RuleRegistry, mark: &MarkConfig) -> Result<(), CanonError> {
    registry.register_named(
        "ruby-revision",
        PROJECT,
        Some("svn-info/ruby"),
        r"(?m)^Last Changed Rev: (\d+)$",
        RuleAction::title_hook(|title, caps, _| {
            title.set(TitleField::Revision, format!("rev:{}", &caps[1]));
            Ok(())
        }),
    )?;

    registry.register_named(
        "ruby-target-system",
        PROJECT,
        Some("configure"),
        r"(?m)^checking target system type\.\.\. (\S+)$",
        RuleAction::title_hook(|title, caps, _| {
            let version = format!("{} [{}]", title.name, &caps[1]);
            title.set(TitleField::Version, version);
            Ok(())
        }),
    )?;

    for section in ["miniversion", "version"] {
        registry.register_named(
            &format!("ruby-{section}"),
            PROJECT,
            Some(section),
            r"(?m)^ruby [0-9].*$",
            RuleAction::title_hook(|title, caps, _| {
                let version = version_with_suffixes(&caps[0], &title.name);
                title.set(TitleField::Version, version);
                Ok(())
            }),
        )?;
    }

    let counter = MarkCounter::from_config(mark)?;
    registry.register_named(
        "ruby-mark",
        PROJECT,
        None,
        &MarkCounter::trigger_pattern(),
        RuleAction::title_hook(move |title, _, text| {
            title.set(TitleField::Mark, counter.mark(text));
            Ok(())
        }),
    )?;

    Ok(())
}

/// `ruby 2.1.0dev (...) [x86_64-linux]`에 빌드 변형 접미어를 붙입니다.
///
/// `ruby-trunk-m32-pth` → `... [m32,pth]`
fn version_with_suffixes(version: &str, display_name: &str) -> String {
    let suffixes: Vec<&str> = display_name
        .split('-')
        .skip(1)
        .filter(|s| !VERSION_SUFFIX_SKIP.contains(s))
        .collect();
    if suffixes.is_empty() {
        version.to_owned()
    } else {
        format!("{version} [{}]", suffixes.join(","))
    }
}

// --- failure hooks ---

fn install_failure_hooks(registry: &mut RuleRegistry) -> Result<(), CanonError> {
    let bootstrap_pass = compile(r"(?m)^PASS all \d+ tests")?;

    registry.register_named(
        "ruby-btest",
        PROJECT,
        Some("btest"),
        r"(?m)^FAIL (\d+)/\d+ tests failed",
        RuleAction::summary(Some(bootstrap_pass.clone()), "BNoSummary", |caps| {
            Ok(Some(format!("{}BFail", &caps[1])))
        }),
    )?;

    // FAIL 줄이 있으면 test/unit 요약 줄보다 항상 우선한다
    let knownbug_summary =
        compile(r"(?m)^\d+ tests, \d+ assertions, (?P<f>\d+) failures, (?P<e>\d+) errors$")?;
    registry.register_named(
        "ruby-test-knownbug",
        PROJECT,
        Some("test-knownbug"),
        r"(?m)^FAIL (\d+)/\d+ tests failed",
        RuleAction::failure_hook(move |pattern, text| {
            if let Some(caps) = pattern.captures_iter(text).last() {
                return Ok(FailureOutcome::Failed(format!("{}KB", &caps[1])));
            }
            if bootstrap_pass.is_match(text) {
                return Ok(FailureOutcome::Passed);
            }
            match knownbug_summary.captures_iter(text).last() {
                Some(caps) => Ok(match failure_counts(&caps, "f", "e")? {
                    Some((f, e)) => FailureOutcome::Failed(format!("KB{f}F{e}E")),
                    None => FailureOutcome::Passed,
                }),
                None => Ok(FailureOutcome::Unparseable("KBNoSummary".to_owned())),
            }
        }),
    )?;

    registry.register_named(
        "ruby-test.rb",
        PROJECT,
        Some("test.rb"),
        r"(?m)^(?:not ok/)?test: \d+ failed (\d+)",
        RuleAction::summary(Some(compile(r"(?m)^end of test")?), "NotOK?", |caps| {
            Ok(Some(format!("{}NotOK", &caps[1])))
        }),
    )?;

    registry.register_named(
        "ruby-test-all",
        PROJECT,
        Some("test-all"),
        r"(?m)^\d+ tests, \d+ assertions, (?P<f>\d+) failures, (?P<e>\d+) errors(?:, \d+ skips)?$",
        RuleAction::summary(None, "NoSummary", |caps| {
            Ok(failure_counts(caps, "f", "e")?.map(|(f, e)| format!("{f}F{e}E")))
        }),
    )?;

    registry.register_named(
        "ruby-rubyspec",
        PROJECT,
        Some("rubyspec"),
        r"(?m)^\d+ files?, \d+ examples?, \d+ expectations?, (?P<f>\d+) failures?, (?P<e>\d+) errors?$",
        RuleAction::summary(None, "rubyspec:NoSummary", |caps| {
            Ok(failure_counts(caps, "f", "e")?.map(|(f, e)| format!("rubyspec:{f}F{e}E")))
        }),
    )?;

    Ok(())
}

/// 실패/에러 개수를 읽습니다. 둘 다 0이면 `None`.
fn failure_counts(
    caps: &Captures<'_>,
    failures: &str,
    errors: &str,
) -> Result<Option<(u64, u64)>, ActionError> {
    let read = |group: &str| -> Result<u64, ActionError> {
        caps.name(group)
            .ok_or_else(|| ActionError::new(format!("missing capture '{group}'")))?
            .as_str()
            .parse::<u64>()
            .map_err(|e| ActionError::new(format!("capture '{group}': {e}")))
    };
    let f = read(failures)?;
    let e = read(errors)?;
    Ok(if f == 0 && e == 0 { None } else { Some((f, e)) })
}

// --- diff 전처리 치환 ---

fn install_rewrites(registry: &mut RuleRegistry) -> Result<(), CanonError> {
    // #define RUBY_RELEASE_DATE "2013-04-06"
    replace(registry, "release-date", r#"^#define RUBY_RELEASE_DATE ".*""#, r#"#define RUBY_RELEASE_DATE "<year>-<mm>-<dd>""#)?;
    // #define RUBY_RELEASE_YEAR 2013
    replace(registry, "release-ymd", r"^#define RUBY_RELEASE_(YEAR|MONTH|DAY) \d+", "#define RUBY_RELEASE_${1} <num>")?;
    // ruby 1.9.2dev (2009-12-07 trunk 26037) [i686-linux]
    replace(registry, "version-banner", r"ruby [0-9.a-z]+ \(.*\) \[.*\]$", "ruby <version>")?;
    // tcltklib: tcltklib 2010-08-25 :: Ruby2.0.0 (2012-02-20) with pthread :: ...
    replace(registry, "tcltklib", r"^tcltklib: (.*)Ruby[\d.]+ \([\d-]+\)", "tcltklib: ${1}Ruby<version> (<release-date>)")?;

    // file.c:884: warning: comparison between signed and unsigned
    // vm.c:2012:5: warning: "OPT_BASIC_OPERATIONS" is not defined
    // .../pack.c:89: Problem during constant expression evaluation: syntax error
    //        from .../test_autoload.rb:82:in `block (2 levels) in test_threaded_accessing_constant'
    registry.register_named(
        "ruby-warning-lines",
        PROJECT,
        None,
        r"\A([^:]*:)(\d+)(:((?:\d+:)? (?:[Ww]arning: |Problem )|in `.*').*)",
        RuleAction::allocate("${1}<linenum>${3}", "${2}", "${1}<line_${id}>${3}"),
    )?;

    // Doxygen
    replace(registry, "doxygen-dot", r"Running dot for graph \d+/\d+", "Running dot for graph <num>/<num>")?;
    replace(registry, "doxygen-map", r"Inserting map/figure \d+/\d+", "Inserting map/figure <num>/<num>")?;
    // gcc ... -DRUBY_RELEASE_DATE=\"2010-05-04\" ... tcltklib.c
    replace(registry, "release-date-define", r#"-DRUBY_RELEASE_DATE=\\"\d+-\d\d-\d\d\\""#, r#"-DRUBY_RELEASE_DATE=\"YYYY-MM-DD\""#)?;
    // done.  (0.07user 0.01system 0.05elapsed)
    replace(registry, "done-times", r"^done\.  \(\d+\.\d\duser \d+\.\d\dsystem \d+\.\d\delapsed\)", "done.  (X.XXuser X.XXsystem X.XXelapsed)")?;
    // rdoc:  99% [512/513]   ext/zlib/zlib.c
    replace(registry, "rdoc-progress", r"^\s*\d+%\s+\[\s*\d+/\d+\]", "XXX% [XXX/XXX]")?;
    // test_exception.rb #1 test_exception.rb:1
    replace(registry, "btest-number", r"#\d+ test_", "#<n> test_")?;
    //  28) Error:
    replace(registry, "test-number", r"^ *\d+\)( Error:| Failure:| Skipped:|$)", " <n>)${1}")?;
    // -- flattens self (ERROR - 21)
    replace(registry, "rubyspec-number", r"\((FAILED|ERROR) - \d+\)$", "(${1} - <n>)")?;
    // (druby://localhost:54321)
    replace(registry, "druby-port", r"\((druby|drbssl)://([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*):\d+\)", "(${1}://${2}:<port>)")?;

    // [2006-09-24T12:48:49.245737 #6902] ERROR -- : ...
    registry.register_named(
        "ruby-logger-time",
        PROJECT,
        None,
        r"\[\d\d\d\d-\d\d-\d\dT\d\d:\d\d:\d\d(\.\d+) #(\d+)\]",
        RuleAction::gsub(|caps| {
            let fraction: String = caps[1]
                .chars()
                .map(|c| if c.is_ascii_digit() { 's' } else { c })
                .collect();
            Ok(format!("[YYYY-MM-DDThh:mm:ss{fraction} #<pid>]"))
        }),
    )?;

    // #<String:0x4455ae94
    replace(registry, "object-address", r"(#<[A-Z][A-Za-z0-9_]*(?:::[A-Z][A-Za-z0-9_]*)*:0x)[0-9a-f]+", "${1}<address>")?;
    // #<#<Class:0x<address>>::Enum:0x00000000d76e98 (after object-address)
    replace(registry, "anon-class-address", r"(#<#<Class:0x<address>>(?:::[A-Z][A-Za-z0-9_]*)*:0x)[0-9a-f]+", "${1}<address>")?;
    // #<BigDecimal:403070d8,
    replace(registry, "bigdecimal-address", r"(#<BigDecimal:)[0-9a-f]+", "${1}<address>")?;
    // uncaught throw `blah' in thread 0x23f0660
    replace(registry, "thread-address", r"(thread 0x)[0-9a-f]+", "${1}<address>")?;

    // XSD::ValueSpaceError: ... cannot accept '2007-02-01T23:44:2682967.846399999994901+09:00'.
    let digits = compile(r"\d+")?;
    registry.register_named(
        "ruby-xsd-datetime",
        PROJECT,
        None,
        r"\d{4}-\d\d-\d\dT\d\d:\d\d:\d\d\d+\.\d+",
        RuleAction::gsub(move |caps| {
            let mut parts = DATETIME_PARTS.iter();
            let mut failed = false;
            let out = digits.replace_all(&caps[0], |_: &Captures<'_>| match parts.next() {
                Some(part) => format!("<{part}>"),
                None => {
                    failed = true;
                    String::new()
                }
            });
            if failed {
                return Err(ActionError::new("more digit groups than datetime parts"));
            }
            Ok(out.into_owned())
        }),
    )?;

    // mkdir -p .../tmp/fileutils.rb.23661/tmpdir/dir/
    replace(registry, "fileutils-tmpdir", r"/tmp/fileutils.rb.\d+/tmpdir/", "/tmp/fileutils.rb.<n>/tmpdir/")?;
    // connect to #<Addrinfo: [::1]:54046 TCP>.
    replace(registry, "addrinfo-port", r"#<Addrinfo: \[::1\]:\d+", "#<Addrinfo: [::1]:<port>")?;
    // undefined method `mode' for #<File:fd 17>
    replace(registry, "file-fd", r"#<File:fd \d+>", "#<File:fd n>")?;
    replace(registry, "elapsed", r"^Elapsed: [0-9.]+s", "Elapsed: <t>s")?;
    // Finished in 139.785699 seconds.
    replace(registry, "finished-in", r"^Finished in [0-9.]+ seconds", "Finished in <t> seconds")?;
    // Finished ptests in 2.061711s, 3.8803 tests/s, 0.9701 assertions/s.
    replace(registry, "finished-ptests", r"^Finished ptests in [0-9.]+s, [0-9.]+ tests/s, [0-9.]+ assertions/s.", "Finished ptests in <n>s, <n> tests/s, <n> assertions/s.")?;
    // Finished tests in 527.896930s, 16.5241 tests/s, 4174.6880 assertions/s.
    replace(registry, "finished-tests", r"^Finished tests in [0-9.]+s, [0-9.]+ tests/s, [0-9.]+ assertions/s\.", "Finished tests in <n>s, <n> tests/s, <n> assertions/s.")?;
    replace(registry, "rubygems-tmp", r"/tmp/test_rubygems_\d+", "/tmp/test_rubygems_<pid>")?;
    // mock.rb:128:in `__ms_70044980_respond_to?__'
    replace(registry, "mspec-ms-id", r"__ms_-?\d+_", "__ms_<object_id>_")?;
    replace(registry, "mspec-id", r"__mspec_-?\d+_", "__mspec_<object_id>_")?;
    // Complex_Test#test_parse: 0.01 s: .
    replace(registry, "elapsed-colon", r"-?\d+\.\d\d s: ", "<elapsed> s: ")?;
    // CGIMultipartTest#test_cgi_multipart_badbody = 0.01 s = .
    replace(registry, "elapsed-equals", r"-?\d+\.\d\d s =", "<elapsed> s =")?;
    replace(registry, "generate-test-csv", r"generate_test_\d+.csv", "generate_test_<digits>.csv")?;
    // #<Process::Status: pid 7502 exit 1>
    replace(registry, "process-status-pid", r"#<Process::Status: pid \d+ ", "#<Process::Status: pid <pid> ")?;
    // Version of .../all-wcprops : 26238
    replace(registry, "doxygen-version-of", r"^(Version of .* : )\d+$", "${1}<num>")?;
    // 6937 tests, 2165250 assertions, 6 failures, 0 errors, 0 skips
    replace(registry, "test-all-assertions", r"^(\d+ tests, )\d+( assertions, \d+ failures, \d+ errors, \d+ skips)$", "${1}<num>${2}")?;
    replace(registry, "test-seed", r"Test run options: --seed \d+ --verbose", "Test run options: --seed <num> --verbose")?;
    replace(registry, "pts-device", r"/dev/pts/\d+", "/dev/pts/N")?;
    // 2932 files, 13911 examples, 182945 expectations, 34 failures, 24 errors
    replace(registry, "rubyspec-expectations", r"^(\d+ files?, \d+ examples?, )\d+( expectations?, \d+ failures?, \d+ errors?)$", "${1}<num>${2}")?;

    // make dist
    replace(registry, "dist-relname", r"(RELNAME=[0-9A-Za-z/_.-]+@)\d+", "${1}<rev>")?;
    replace(registry, "dist-make-snapshot", r"(make-snapshot tmp [0-9A-Za-z/_.-]+@)\d+", "${1}<rev>")?;
    replace(registry, "dist-exporting", r"(Exporting [0-9A-Za-z/_.-]+@)\d+", "${1}<rev>")?;
    replace(registry, "dist-exported", r"(Exported revision )\d+", "${1}<rev>")?;
    replace(registry, "dist-snapshot-dir", r"ruby-snapshot[-0-9a-z]+/ruby-[0-9a-z.-]+", "ruby-snapshot<tmp>/ruby-<verrev>")?;
    replace(registry, "tmp-scripts", r"/tmp/(autoload|bug5754|test_exception_in_exception_equal)\d+-\d+-[0-9a-z]+", "/tmp/${1}<tmp>")?;
    replace(registry, "dist-archive", r"ruby-[0-9a-z.-]+\.(tar|zip)", "ruby-<verrev>.${1}")?;
    replace(registry, "dist-size", r"^( *SIZE:\s+)[0-9]+", "${1}<size>")?;
    replace(registry, "dist-digest", r"^( *(MD5|SHA256):\s+)[0-9a-f]+", "${1}<digest>")?;

    Ok(())
}

// --- 정렬 ---

fn install_sorts(registry: &mut RuleRegistry) -> Result<(), CanonError> {
    // MinitestSpec#test_needs_to_verify_nil: <elapsed> s: .
    registry.register_named(
        "ruby-sort-test-timing",
        PROJECT,
        None,
        r"\A[A-Z][A-Za-z0-9_]+(::[A-Z][A-Za-z0-9_]+)*#",
        RuleAction::Sort,
    )?;
    // - returns self as a symbol literal for :$*
    registry.register_named(
        "ruby-sort-symbol-literal",
        PROJECT,
        None,
        r"\A- returns self as a symbol literal for :",
        RuleAction::Sort,
    )?;
    Ok(())
}

fn replace(
    registry: &mut RuleRegistry,
    name: &str,
    pattern: &str,
    template: &str,
) -> Result<(), CanonError> {
    registry.register_named(
        &format!("ruby-{name}"),
        PROJECT,
        None,
        pattern,
        RuleAction::replace(template),
    )?;
    Ok(())
}

fn compile(pattern: &str) -> Result<Regex, CanonError> {
    Regex::new(pattern).map_err(|e| CanonError::invalid_pattern(pattern, e))
}
