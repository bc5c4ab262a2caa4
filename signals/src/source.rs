use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    sync::Arc,
};

use log::debug;

use crate::{
    broadcast::BroadcastQueue,
    config::Config,
    error::{Result, SignalError},
    watcher::Watcher,
};

/// Fixed mapping from channel name to its queue.
pub struct ChannelRegistry<T> {
    queues: HashMap<String, BroadcastQueue<T>>,
}

impl<T> ChannelRegistry<T> {
    /// Builds one empty queue per distinct name; repeated names share one.
    pub fn new<I, S>(names: I, config: Config) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queues = HashMap::new();
        for name in names {
            queues
                .try_reserve(1)
                .map_err(|_| SignalError::Allocation {
                    what: "channel registry",
                })?;

            if let Entry::Vacant(slot) = queues.entry(name.into()) {
                let queue = BroadcastQueue::new(slot.key().clone(), config)?;
                slot.insert(queue);
            }
        }
        Ok(Self { queues })
    }

    pub fn get(&self, name: &str) -> Result<&BroadcastQueue<T>> {
        self.queues
            .get(name)
            .ok_or_else(|| SignalError::UnknownChannel(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

/// Producer-side entry point: a fixed set of named broadcast channels.
///
/// `emit` and `subscribe` take `&self`, so one source is shared between any
/// number of producer and watcher threads; producers of the same channel meet
/// only at that channel's tail. Watchers borrow the source and can therefore
/// never outlive its queues.
///
/// ```
/// use signals::Source;
///
/// let source = Source::<u32>::new(["a", "b"])?;
/// let mut watcher = source.subscribe("a")?;
///
/// source.emit("a", 1u32)?;
/// source.emit("a", 2u32)?;
/// assert_eq!(*watcher.wait(), 1);
/// assert_eq!(*watcher.wait(), 2);
///
/// source.emit("b", 9u32)?;
/// assert!(watcher.try_wait().is_none());
/// # Ok::<(), signals::SignalError>(())
/// ```
pub struct Source<T> {
    registry: ChannelRegistry<T>,
    config: Config,
}

impl<T> Source<T> {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(names, Config::default())
    }

    pub fn with_config<I, S>(names: I, config: Config) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = ChannelRegistry::new(names, config)?;
        debug!(
            "Signal source created: {} channels, {} strategy",
            registry.len(),
            config.strategy()
        );
        Ok(Self { registry, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Appends `payload` to channel `name` and wakes its blocked watchers.
    ///
    /// The payload is shared, never copied: every watcher receives a
    /// reference to the very same value.
    pub fn emit(&self, name: &str, payload: impl Into<Arc<T>>) -> Result<()> {
        self.registry.get(name)?.push(payload.into());
        Ok(())
    }

    /// Starts watching channel `name`. Only payloads emitted after this call
    /// are delivered.
    pub fn subscribe(&self, name: &str) -> Result<Watcher<'_, T>> {
        let watcher = self.registry.get(name)?.watch();
        debug!("New watcher on \"{name}\"");
        Ok(watcher)
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.get(name).is_ok()
    }

    /// Number of payloads emitted on `name` so far.
    pub fn emitted(&self, name: &str) -> Result<u64> {
        Ok(self.registry.get(name)?.emitted())
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut channels: Vec<&str> = self.channels().collect();
        channels.sort_unstable();
        f.debug_struct("Source")
            .field("channels", &channels)
            .field("config", &self.config)
            .finish()
    }
}
