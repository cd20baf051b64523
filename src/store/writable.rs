//! 可订阅的可写状态容器
//!
//! 支持读取当前值、整体替换、订阅变更通知和取消订阅。
//! 每次写入都会在写入线程上同步通知所有订阅者。
//! 并发写入按顺序串行化（写值和通知作为一个整体），
//! 订阅者最后收到的值总是 store 的当前值。

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    /// 当前值
    value: RwLock<T>,
    /// 订阅者列表（按订阅顺序）
    subscribers: Mutex<Vec<(u64, Subscriber<T>)>>,
    /// 订阅 ID 计数器
    next_id: AtomicU64,
    /// 写入锁：覆盖写值和通知；可重入，订阅者回调里可以再写本 store
    write_lock: ReentrantMutex<()>,
}

/// 可写 store
///
/// 克隆得到的是同一个 store 的另一个句柄。
pub struct Writable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Writable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(initial),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                write_lock: ReentrantMutex::new(()),
            }),
        }
    }

    /// 当前值（克隆）
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// 不克隆地读取当前值
    ///
    /// 闭包执行期间持有读锁，不要在闭包里写同一个 store
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.value.read();
        f(&*guard)
    }

    /// 整体替换当前值并通知订阅者
    pub fn set(&self, value: T) {
        let _write = self.inner.write_lock.lock();
        *self.inner.value.write() = value.clone();
        self.notify(&value);
    }

    /// 基于当前值修改并通知订阅者
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let _write = self.inner.write_lock.lock();
        let value = {
            let mut guard = self.inner.value.write();
            f(&mut *guard);
            guard.clone()
        };
        self.notify(&value);
    }

    /// 订阅变更
    ///
    /// 订阅时立即用当前值回调一次，之后每次写入都会回调。
    /// 返回的 [`Subscription`] 被丢弃时不会自动取消订阅。
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Subscriber<T> = Arc::new(callback);

        // 注册和首次回调之间不能插入其他写入
        let write = self.inner.write_lock.lock();
        self.inner
            .subscribers
            .lock()
            .push((id, Arc::clone(&callback)));

        let current = self.get();
        callback(&current);
        drop(write);

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            id,
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.lock().retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// 移除所有订阅者（应用关闭时调用）
    pub fn clear_subscribers(&self) {
        self.inner.subscribers.lock().clear();
    }

    /// 在值锁和订阅者锁之外依次回调（调用方持有写入锁）
    fn notify(&self, value: &T) {
        let subscribers: Vec<Subscriber<T>> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();

        for subscriber in subscribers {
            subscriber(value);
        }
    }
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Writable<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writable")
            .field("value", &*self.inner.value.read())
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}

/// 订阅句柄
#[must_use = "丢弃句柄不会取消订阅，需要时请保存并调用 unsubscribe()"]
pub struct Subscription {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 取消订阅，之后的写入不再通知该订阅者
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
