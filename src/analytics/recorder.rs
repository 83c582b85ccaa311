use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::StatEvent;

/// 排序后的统计条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// 受同一把锁保护的可变状态
struct RecorderState {
    counts: HashMap<String, u64>,
    /// 打开失败时为 None，此时只在内存中计数
    file: Option<File>,
}

/// 点击记录器
///
/// 追加 + fsync 在持有锁时完成，并发点击会在磁盘 I/O 上串行。
pub struct ClickRecorder {
    path: Option<PathBuf>,
    state: Mutex<RecorderState>,
}

impl ClickRecorder {
    /// 从日志重建计数，然后以追加模式打开日志
    ///
    /// 任何文件错误都只记录日志，不会导致失败。
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let recorder = Self {
            path: Some(path.clone()),
            state: Mutex::new(RecorderState {
                counts: HashMap::new(),
                file: None,
            }),
        };

        let replayed = recorder.load_aggregate();
        debug!("Replayed {} click events from {}", replayed, path.display());

        match OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
        {
            Ok(file) => recorder.state.lock().file = Some(file),
            Err(e) => error!(
                "Failed to open click log {}: {}, clicks will only be counted in memory",
                path.display(),
                e
            ),
        }

        recorder
    }

    /// 不落盘的记录器
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(RecorderState {
                counts: HashMap::new(),
                file: None,
            }),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.state.lock().file.is_some()
    }

    /// 逐行重放日志重建计数，返回成功解析的事件数
    fn load_aggregate(&self) -> usize {
        let Some(ref path) = self.path else {
            return 0;
        };

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Cannot read click log {}: {}", path.display(), e);
                return 0;
            }
        };

        let mut state = self.state.lock();
        state.counts.clear();
        let mut replayed = 0;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Stopped reading click log at line {}: {}", lineno + 1, e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<StatEvent>(line) {
                Ok(event) => {
                    *state.counts.entry(event.category).or_insert(0) += 1;
                    replayed += 1;
                }
                Err(e) => warn!("Skipping malformed click log line {}: {}", lineno + 1, e),
            }
        }
        replayed
    }

    /// 记录一次点击：内存计数一定成功，落盘尽力而为
    pub fn record_click(&self, category: &str) {
        let mut state = self.state.lock();
        *state.counts.entry(category.to_string()).or_insert(0) += 1;

        let Some(file) = state.file.as_mut() else {
            return;
        };

        let event = StatEvent::tool_click(category);
        let mut line = match serde_json::to_vec(&event) {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to serialize click event: {}", e);
                return;
            }
        };
        line.push(b'\n');

        if let Err(e) = file.write_all(&line).and_then(|_| file.sync_all()) {
            error!("Failed to append click event for '{}': {}", category, e);
        }
    }

    /// 按次数降序，次数相同按分类名升序
    pub fn sorted_snapshot(&self) -> Vec<CategoryCount> {
        let mut snapshot: Vec<CategoryCount> = {
            let state = self.state.lock();
            state
                .counts
                .iter()
                .map(|(category, count)| CategoryCount {
                    category: category.clone(),
                    count: *count,
                })
                .collect()
        };
        snapshot.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.cmp(&b.category))
        });
        snapshot
    }
}
