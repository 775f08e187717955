//! 정규화 상태 -- 한 로그 처리 동안의 식별자 할당
//!
//! `gsub_stateful` 규칙은 휘발성 값(예: 경고 줄 번호)을 짧은 식별자로 바꿉니다.
//! 같은 정규화 키 아래에서 처음 본 원시 값은 `a, b, …, z, aa, ab, …` 순서로
//! 다음 식별자를 받고, 이미 본 값은 기존 식별자를 재사용합니다.
//!
//! [`CanonState`]는 로그 하나마다 새로 만들며 동시 처리 간에 공유하지 않습니다.

use std::collections::HashMap;

/// n번째(0부터) 식별자를 만듭니다.
///
/// 문자만 쓰는 bijective base-26 표기입니다.
/// `0 → a`, `25 → z`, `26 → aa`, `27 → ab`, `701 → zz`, `702 → aaa`.
pub fn id_label(n: usize) -> String {
    let mut rest = n;
    let mut reversed = Vec::new();
    loop {
        reversed.push(char::from(b'a' + (rest % 26) as u8));
        if rest < 26 {
            break;
        }
        rest = rest / 26 - 1;
    }
    reversed.into_iter().rev().collect()
}

/// 정규화 키 하나의 할당 기록
#[derive(Debug, Default, Clone)]
struct KeyAllocation {
    /// 다음에 줄 식별자 번호
    next: usize,
    /// 원시 값 -> 할당된 번호
    assigned: HashMap<String, usize>,
}

/// 규칙 하나의 식별자 테이블
///
/// 정규화 키마다 독립적인 카운터를 가집니다.
#[derive(Debug, Default, Clone)]
pub struct IdTable {
    keys: HashMap<String, KeyAllocation>,
    /// [`IdTable::begin`] 이후 새로 할당한 `(key, raw)`, 할당 순서
    pending: Option<Vec<(String, String)>>,
}

impl IdTable {
    /// 새 테이블을 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// `key` 아래에서 `raw` 값의 식별자를 돌려줍니다. 처음 보는 값이면 새로 할당합니다.
    pub fn assign(&mut self, key: &str, raw: &str) -> String {
        let allocation = self.keys.entry(key.to_owned()).or_default();
        let index = match allocation.assigned.get(raw) {
            Some(index) => *index,
            None => {
                let index = allocation.next;
                allocation.assigned.insert(raw.to_owned(), index);
                allocation.next += 1;
                if let Some(pending) = self.pending.as_mut() {
                    pending.push((key.to_owned(), raw.to_owned()));
                }
                index
            }
        };
        id_label(index)
    }

    /// 되돌릴 수 있는 할당 구간을 시작합니다.
    ///
    /// [`IdTable::commit`] 또는 [`IdTable::rollback`]으로 끝냅니다.
    pub fn begin(&mut self) {
        self.pending = Some(Vec::new());
    }

    /// 구간의 할당을 확정합니다.
    pub fn commit(&mut self) {
        self.pending = None;
    }

    /// 구간에서 새로 할당한 식별자를 모두 취소합니다.
    ///
    /// 취소된 원시 값은 다음에 다시 보면 같은 식별자를 새로 받습니다.
    pub fn rollback(&mut self) {
        let Some(mut pending) = self.pending.take() else {
            return;
        };
        while let Some((key, raw)) = pending.pop() {
            let Some(allocation) = self.keys.get_mut(&key) else {
                continue;
            };
            allocation.assigned.remove(&raw);
            allocation.next = allocation.next.saturating_sub(1);
            if allocation.next == 0 {
                self.keys.remove(&key);
            }
        }
    }

    /// 등록된 정규화 키 수
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// `key` 아래에서 할당된 식별자 수
    pub fn assigned_count(&self, key: &str) -> usize {
        self.keys.get(key).map_or(0, |a| a.assigned.len())
    }
}

/// 로그 하나에 대한 정규화 상태
///
/// `gsub_stateful` 규칙마다 [`IdTable`] 하나를 가집니다.
/// 규칙은 레지스트리가 부여한 일련번호로 구분합니다.
#[derive(Debug, Default, Clone)]
pub struct CanonState {
    tables: HashMap<u64, IdTable>,
}

impl CanonState {
    /// 빈 상태를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙의 식별자 테이블 (없으면 생성)
    pub fn table_mut(&mut self, rule_seq: u64) -> &mut IdTable {
        self.tables.entry(rule_seq).or_default()
    }

    /// 규칙의 식별자 테이블
    pub fn table(&self, rule_seq: u64) -> Option<&IdTable> {
        self.tables.get(&rule_seq)
    }

    /// 아직 아무 식별자도 할당하지 않았는지
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.key_count() == 0)
    }
}
