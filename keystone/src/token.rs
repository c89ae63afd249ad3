//! Tokens that name the contracts stored in the DI container

use crate::error::Error;
use std::{
    any::{TypeId, type_name},
    borrow::Cow,
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// An erased identity of a registered service.
///
/// Two keys are equal when they describe the same type and the same
/// (optional) name. The type name is kept only for diagnostics.
#[derive(Clone)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Cow<'static, str>>,
}

impl Key {
    /// Creates a key that identifies a service by its type
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: None,
        }
    }

    /// Creates a key that identifies a service by its type and name
    #[inline]
    pub fn named<T: 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::of::<T>()
        }
    }

    /// Returns the name of a service type
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the service name if the key is a named one
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Checks that the key can be used for registration.
    ///
    /// A named key must carry a non-blank name.
    pub fn validate(&self) -> Result<(), Error> {
        match &self.name {
            Some(name) if name.trim().is_empty() => Err(Error::InvalidToken(self.type_name)),
            _ => Ok(()),
        }
    }
}

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for Key {}

impl Hash for Key {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}(\"{name}\")", self.type_name),
            None => f.write_str(self.type_name),
        }
    }
}

impl Debug for Key {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A strongly typed token.
///
/// Resolving a `Token<T>` always yields an `Arc<T>`, so a token can not be used
/// to fetch an implementation of a different type.
///
/// # Example
/// ```no_run
/// use keystone::{ContainerBuilder, Token};
///
/// struct ConnectionString(String);
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), keystone::error::Error> {
/// const PRIMARY: &str = "primary";
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(Token::named(PRIMARY), ConnectionString("postgres://".into()))?;
///
/// let container = builder.build();
/// let conn = container.resolve_token(&Token::<ConnectionString>::named(PRIMARY)).await?;
/// assert_eq!(conn.0, "postgres://");
/// # Ok(())
/// # }
/// ```
pub struct Token<T> {
    key: Key,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Token<T> {
    /// Creates a token that names a service by its type only
    #[inline]
    pub fn new() -> Self {
        Self::from_key(Key::of::<T>())
    }

    /// Creates a token that names one of several services of the same type
    #[inline]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from_key(Key::named::<T>(name))
    }

    #[inline]
    fn from_key(key: Key) -> Self {
        Self { key, _marker: PhantomData }
    }
}

impl<T> Token<T> {
    /// Returns the erased key of this token
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub(crate) fn into_key(self) -> Key {
        self.key
    }
}

impl<T: 'static> Default for Token<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Token<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { key: self.key.clone(), _marker: PhantomData }
    }
}

impl<T> Debug for Token<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.key).finish()
    }
}

impl<T> Display for Token<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.key, f)
    }
}

impl<T> From<Token<T>> for Key {
    #[inline]
    fn from(token: Token<T>) -> Self {
        token.key
    }
}
