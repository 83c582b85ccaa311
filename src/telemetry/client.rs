//! 远程日志批量上报客户端
//!
//! - `send` 只在锁内追加到缓冲区，不做网络 I/O
//! - 缓冲区达到阈值时后台触发一次 flush（同一时间最多一个）
//! - 定时任务无论缓冲区多少都会 flush
//! - flush 在锁外发送，失败的批次直接丢弃，不重试

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::transport::{Batch, BatchTransport};
use super::Message;
use crate::errors::{Result, SiteError};

/// 客户端参数
#[derive(Debug, Clone, Copy)]
pub struct TelemetryOptions {
    /// 达到该条数时触发 flush
    pub buffer_size: usize,
    /// 定时 flush 间隔
    pub flush_interval: Duration,
    /// 缓冲区硬上限，超出的消息被丢弃
    pub max_buffered: usize,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            flush_interval: Duration::from_secs(5),
            max_buffered: 10_000,
        }
    }
}

/// 待发送的消息，及其并发控制状态
struct TelemetryBuffer {
    lines: Mutex<Vec<Vec<u8>>>,
    /// 是否已有阈值 flush 任务待处理（防止重复 spawn）
    flush_pending: AtomicBool,
    /// 因超出上限被丢弃的消息数
    dropped: AtomicU64,
}

struct Inner {
    buffer: TelemetryBuffer,
    tags: Mutex<Vec<String>>,
    defaults: Message,
    transport: Arc<dyn BatchTransport>,
    options: TelemetryOptions,
}

#[derive(Clone)]
pub struct TelemetryClient {
    inner: Arc<Inner>,
}

impl TelemetryClient {
    pub fn new(
        transport: Arc<dyn BatchTransport>,
        options: TelemetryOptions,
        defaults: Message,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                buffer: TelemetryBuffer {
                    lines: Mutex::new(Vec::new()),
                    flush_pending: AtomicBool::new(false),
                    dropped: AtomicU64::new(0),
                },
                tags: Mutex::new(Vec::new()),
                defaults,
                transport,
                options,
            }),
        }
    }

    /// 缓冲一条结构化消息
    ///
    /// 没有 `timestamp` 时补上毫秒时间戳；默认字段会覆盖同名字段。
    pub fn send(&self, mut msg: Message) -> Result<()> {
        if !msg.contains_key("timestamp") {
            msg.insert(
                "timestamp".to_string(),
                Value::from(chrono::Utc::now().timestamp_millis()),
            );
        }
        for (k, v) in &self.inner.defaults {
            msg.insert(k.clone(), v.clone());
        }

        let line = serde_json::to_vec(&msg)?;
        self.push_line(line);
        Ok(())
    }

    /// 由键值对构造消息并发送
    pub fn log<I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let msg: Message = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if msg.is_empty() {
            return Err(SiteError::telemetry("log called without any key/value pairs"));
        }
        self.send(msg)
    }

    /// 追加一条已经序列化好的原始数据
    pub fn write_raw(&self, raw: &[u8]) {
        self.push_line(raw.to_vec());
    }

    /// 追加标签，后续的 flush 会带上
    pub fn tag<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags = self.inner.tags.lock();
        tags.extend(names.into_iter().map(Into::into));
    }

    pub fn tags(&self) -> Vec<String> {
        self.inner.tags.lock().clone()
    }

    /// 当前缓冲的消息数
    pub fn buffered(&self) -> usize {
        self.inner.buffer.lines.lock().len()
    }

    /// 因缓冲区满而丢弃的消息数
    pub fn dropped(&self) -> u64 {
        self.inner.buffer.dropped.load(Ordering::Relaxed)
    }

    /// 立即发送当前缓冲区
    pub async fn flush(&self) -> anyhow::Result<()> {
        self.inner.flush().await
    }

    /// 定时 flush，直到 `cancel` 被触发
    pub async fn run_flush_loop(&self, cancel: CancellationToken) {
        let period = self.inner.options.flush_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Telemetry flush loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    trace!("Telemetry: scheduled flush");
                    // 错误已在 flush 内部记录
                    let _ = self.inner.flush().await;
                }
            }
        }
    }

    fn push_line(&self, line: Vec<u8>) {
        let buffer = &self.inner.buffer;
        let len = {
            let mut lines = buffer.lines.lock();
            if lines.len() >= self.inner.options.max_buffered {
                let dropped = buffer.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 1000 == 0 {
                    warn!("Telemetry buffer full, {} messages dropped so far", dropped);
                }
                return;
            }
            lines.push(line);
            lines.len()
        };

        if len >= self.inner.options.buffer_size {
            self.trigger_flush();
        }
    }

    /// 只有成功把 flush_pending 从 false 设为 true 的调用者才 spawn
    fn trigger_flush(&self) {
        let buffer = &self.inner.buffer;
        if !buffer.try_claim_flush() {
            trace!("Telemetry: flush already pending, skipping");
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // 不在 runtime 中，交给定时任务处理
            buffer.flush_pending.store(false, Ordering::Release);
            return;
        };

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            loop {
                let _ = inner.flush().await;
                inner.buffer.flush_pending.store(false, Ordering::Release);
                // flush 期间写入的消息可能已经超过阈值，但当时的触发被跳过了
                if !inner.over_threshold() || !inner.buffer.try_claim_flush() {
                    break;
                }
                trace!("Telemetry: buffer refilled during flush, flushing again");
            }
        });
    }
}

impl TelemetryBuffer {
    fn try_claim_flush(&self) -> bool {
        self.flush_pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }
}

impl Inner {
    fn over_threshold(&self) -> bool {
        self.buffer.lines.lock().len() >= self.options.buffer_size
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let lines = {
            let mut lines = self.buffer.lines.lock();
            if lines.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *lines)
        };

        let tags = {
            let tags = self.tags.lock();
            if tags.is_empty() {
                None
            } else {
                Some(tags.join(","))
            }
        };

        let count = lines.len();
        let batch = Batch {
            body: lines.join(&b'\n'),
            tags,
            messages: count,
        };

        match self.transport.post_batch(batch).await {
            Ok(()) => {
                debug!("Telemetry: flushed {} messages", count);
                Ok(())
            }
            Err(e) => {
                warn!("Telemetry: flush failed, dropping {} messages: {}", count, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct MockTransport {
        batches: std::sync::Mutex<Vec<Batch>>,
        fail: bool,
    }

    impl MockTransport {
        fn failing() -> Self {
            Self {
                batches: std::sync::Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn batches(&self) -> Vec<Batch> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BatchTransport for MockTransport {
        async fn post_batch(&self, batch: Batch) -> anyhow::Result<()> {
            self.batches.lock().unwrap().push(batch);
            if self.fail {
                anyhow::bail!("endpoint down");
            }
            Ok(())
        }
    }

    /// 第一次 post 会阻塞，直到 `open` 被调用
    struct GatedTransport {
        sizes: std::sync::Mutex<Vec<usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        gate: tokio::sync::watch::Sender<bool>,
    }

    impl GatedTransport {
        fn new() -> Self {
            Self {
                sizes: std::sync::Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                gate: tokio::sync::watch::channel(false).0,
            }
        }

        fn open(&self) {
            self.gate.send_replace(true);
        }

        fn sizes(&self) -> Vec<usize> {
            self.sizes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BatchTransport for GatedTransport {
        async fn post_batch(&self, batch: Batch) -> anyhow::Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.sizes.lock().unwrap().push(batch.messages);

            let mut gate = self.gate.subscribe();
            let _ = gate.wait_for(|open| *open).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn client<T: BatchTransport + 'static>(
        transport: Arc<T>,
        options: TelemetryOptions,
    ) -> TelemetryClient {
        let mut defaults = Message::new();
        defaults.insert("hostname".to_string(), Value::from("web-1"));
        TelemetryClient::new(transport, options, defaults)
    }

    async fn wait_for_posts(transport: &GatedTransport, count: usize) {
        for _ in 0..200 {
            if transport.sizes().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn options(buffer_size: usize) -> TelemetryOptions {
        TelemetryOptions {
            buffer_size,
            flush_interval: Duration::from_secs(5),
            max_buffered: buffer_size * 10,
        }
    }

    #[tokio::test]
    async fn test_send_stamps_timestamp_and_defaults() {
        let transport = Arc::new(MockTransport::default());
        let c = client(Arc::clone(&transport), options(100));

        c.log([("log", "started")]).unwrap();
        c.flush().await.unwrap();

        let batches = transport.batches();
        assert_eq!(batches.len(), 1);
        let msg: Value = serde_json::from_slice(&batches[0].body).unwrap();
        assert_eq!(msg["log"], "started");
        assert_eq!(msg["hostname"], "web-1");
        assert!(msg["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_existing_timestamp_kept() {
        let transport = Arc::new(MockTransport::default());
        let c = client(Arc::clone(&transport), options(100));

        c.log([("timestamp", Value::from(42)), ("event", Value::from("x"))])
            .unwrap();
        c.flush().await.unwrap();

        let msg: Value = serde_json::from_slice(&transport.batches()[0].body).unwrap();
        assert_eq!(msg["timestamp"], 42);
    }

    #[tokio::test]
    async fn test_log_without_pairs_is_error() {
        let c = client(Arc::new(MockTransport::default()), options(100));
        let empty: Vec<(String, Value)> = Vec::new();
        assert!(c.log(empty).is_err());
        assert_eq!(c.buffered(), 0);
    }

    #[tokio::test]
    async fn test_empty_flush_sends_nothing() {
        let transport = Arc::new(MockTransport::default());
        let c = client(Arc::clone(&transport), options(100));
        c.flush().await.unwrap();
        assert!(transport.batches().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_triggers_single_flush() {
        let transport = Arc::new(MockTransport::default());
        let c = client(Arc::clone(&transport), options(10));

        for i in 0..10 {
            c.log([("n", i)]).unwrap();
        }
        // 等待后台 flush 任务完成
        for _ in 0..100 {
            if !transport.batches().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let batches = transport.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages, 10);
        let body = String::from_utf8(batches[0].body.clone()).unwrap();
        assert_eq!(body.split('\n').count(), 10);
        assert_eq!(c.buffered(), 0);
    }

    #[tokio::test]
    async fn test_tags_joined_with_comma() {
        let transport = Arc::new(MockTransport::default());
        let c = client(Arc::clone(&transport), options(100));
        c.tag(["sumatra-website"]);
        c.tag(["production"]);

        c.write_raw(br#"{"raw":true}"#);
        c.flush().await.unwrap();

        let batches = transport.batches();
        assert_eq!(batches[0].tags.as_deref(), Some("sumatra-website,production"));
        assert_eq!(batches[0].body, br#"{"raw":true}"#.to_vec());
    }

    #[tokio::test]
    async fn test_failed_flush_drops_batch() {
        let transport = Arc::new(MockTransport::failing());
        let c = client(Arc::clone(&transport), options(100));

        c.log([("a", 1)]).unwrap();
        assert!(c.flush().await.is_err());
        assert_eq!(c.buffered(), 0);

        // 下一次 flush 不会重发
        c.log([("b", 2)]).unwrap();
        let _ = c.flush().await;
        let batches = transport.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].messages, 1);
    }

    #[tokio::test]
    async fn test_buffer_cap_drops_overflow() {
        let transport = Arc::new(MockTransport::default());
        let c = client(
            Arc::clone(&transport),
            TelemetryOptions {
                buffer_size: 1000,
                flush_interval: Duration::from_secs(5),
                max_buffered: 3,
            },
        );
        for i in 0..5 {
            c.log([("n", i)]).unwrap();
        }
        assert_eq!(c.buffered(), 3);
        assert_eq!(c.dropped(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_partial_batch() {
        let transport = Arc::new(MockTransport::default());
        let c = client(Arc::clone(&transport), options(100));
        let cancel = CancellationToken::new();

        let looper = c.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { looper.run_flush_loop(token).await });

        for i in 0..3 {
            c.log([("n", i)]).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(5100)).await;
        let batches = transport.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages, 3);

        // 空缓冲区的下一次定时 flush 不发送请求
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.batches().len(), 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_sends_during_inflight_flush_use_fresh_buffer() {
        let transport = Arc::new(GatedTransport::new());
        let c = client(Arc::clone(&transport), options(3));

        for i in 0..3 {
            c.log([("n", i)]).unwrap();
        }
        wait_for_posts(&transport, 1).await;

        // post 被阻塞期间 send 不会等待
        for i in 3..10 {
            c.log([("n", i)]).unwrap();
        }
        assert_eq!(c.buffered(), 7);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.sizes(), vec![3]);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);

        transport.open();
        wait_for_posts(&transport, 2).await;
        assert_eq!(transport.sizes(), vec![3, 7]);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        for _ in 0..100 {
            if c.buffered() == 0 && !c.inner.buffer.flush_pending.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(c.buffered(), 0);
        assert!(!c.inner.buffer.flush_pending.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_below_threshold_after_flush_waits_for_timer() {
        let transport = Arc::new(GatedTransport::new());
        let c = client(Arc::clone(&transport), options(3));

        for i in 0..3 {
            c.log([("n", i)]).unwrap();
        }
        wait_for_posts(&transport, 1).await;
        c.log([("n", 3)]).unwrap();

        transport.open();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.sizes(), vec![3]);
        assert_eq!(c.buffered(), 1);
    }
}
