use std::collections::HashMap;

use tracing::warn;

use crate::config::RedirectEntry;

/// 旧路径 → 新地址的精确匹配表，启动后不可变
#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    entries: HashMap<String, String>,
}

impl RedirectTable {
    /// 按顺序插入，重复的 key 以后出现的为准
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = RedirectEntry>,
    {
        let mut map = HashMap::new();
        for entry in entries {
            if let Some(previous) = map.insert(entry.from.clone(), entry.to.clone()) {
                warn!(
                    "Duplicate redirect for '{}': '{}' replaced by '{}'",
                    entry.from, previous, entry.to
                );
            }
        }
        Self { entries: map }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
