//! Cache Key Module
//!
//! Turns an operation call into the string key its result is cached under.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

use crate::cache::OperationId;

/// Separator written before every key segment.
pub const KEY_SEPARATOR: &str = "~~";

// == Cache Key Trait ==
/// Stable string identity of a call argument.
///
/// Implemented for the std scalar and string types through their `Display`
/// form. Types whose natural string form is unstable (for example because it
/// embeds an address or a random id) implement it with their own identity.
pub trait CacheKey {
    fn cache_key(&self) -> Cow<'_, str>;
}

macro_rules! display_cache_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CacheKey for $ty {
                fn cache_key(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

display_cache_key!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

impl CacheKey for str {
    fn cache_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl CacheKey for String {
    fn cache_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: CacheKey + ?Sized> CacheKey for &T {
    fn cache_key(&self) -> Cow<'_, str> {
        (**self).cache_key()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for Box<T> {
    fn cache_key(&self) -> Cow<'_, str> {
        (**self).cache_key()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for Arc<T> {
    fn cache_key(&self) -> Cow<'_, str> {
        (**self).cache_key()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for Rc<T> {
    fn cache_key(&self) -> Cow<'_, str> {
        (**self).cache_key()
    }
}

/// `None` is an empty segment.
impl<T: CacheKey> CacheKey for Option<T> {
    fn cache_key(&self) -> Cow<'_, str> {
        match self {
            Some(value) => value.cache_key(),
            None => Cow::Borrowed(""),
        }
    }
}

impl<T: CacheKey> CacheKey for [T] {
    fn cache_key(&self) -> Cow<'_, str> {
        let parts: Vec<Cow<'_, str>> = self.iter().map(|v| v.cache_key()).collect();
        Cow::Owned(format!("[{}]", parts.join(", ")))
    }
}

impl<T: CacheKey> CacheKey for Vec<T> {
    fn cache_key(&self) -> Cow<'_, str> {
        self.as_slice().cache_key()
    }
}

// == Call Arguments ==
/// One positional argument as seen by a key deriver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Present argument with its key form
    Value(String),
    /// Absent argument, contributes an empty segment
    Absent,
    /// Marked "ignore for caching", contributes nothing
    Ignored,
}

/// Ordered argument list of one call.
///
/// ```
/// use memo_cache::cache::CallArgs;
///
/// let trace_id = "req-8812";
/// let args = CallArgs::new().arg(&42_u64).arg("eur").ignore(&trace_id);
/// assert_eq!(args.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    args: Vec<Argument>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument that takes part in the key.
    pub fn arg<T: CacheKey + ?Sized>(mut self, value: &T) -> Self {
        self.args.push(Argument::Value(value.cache_key().into_owned()));
        self
    }

    /// Appends an optional argument; `None` is an empty segment.
    pub fn opt<T: CacheKey + ?Sized>(mut self, value: Option<&T>) -> Self {
        self.args.push(match value {
            Some(value) => Argument::Value(value.cache_key().into_owned()),
            None => Argument::Absent,
        });
        self
    }

    /// Appends an argument that is skipped when deriving the key.
    pub fn ignore<T: ?Sized>(mut self, _value: &T) -> Self {
        self.args.push(Argument::Ignored);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.args.iter()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

// == Key Deriver Trait ==
/// Strategy producing the cache key of a call.
///
/// Equal arguments must produce equal keys; different arguments should
/// produce different keys.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, operation: &OperationId, args: &CallArgs) -> String;
}

// == Standard Key Deriver ==
/// Writes `~~` followed by each non-ignored argument's key form, in order.
///
/// The operation id is not part of the key: every operation has its own cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardKeyDeriver;

impl KeyDeriver for StandardKeyDeriver {
    fn derive(&self, _operation: &OperationId, args: &CallArgs) -> String {
        let mut key = String::new();
        for arg in args.iter() {
            match arg {
                Argument::Ignored => {}
                Argument::Absent => key.push_str(KEY_SEPARATOR),
                Argument::Value(repr) => {
                    key.push_str(KEY_SEPARATOR);
                    key.push_str(repr);
                }
            }
        }
        key
    }
}

// == Qualified Key Deriver ==
/// Prefixes another deriver's key with `<operation>#`, making keys unique
/// across operations.
#[derive(Debug, Clone, Default)]
pub struct QualifiedKeyDeriver<D = StandardKeyDeriver> {
    inner: D,
}

impl<D: KeyDeriver> QualifiedKeyDeriver<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: KeyDeriver> KeyDeriver for QualifiedKeyDeriver<D> {
    fn derive(&self, operation: &OperationId, args: &CallArgs) -> String {
        format!("{}#{}", operation, self.inner.derive(operation, args))
    }
}
