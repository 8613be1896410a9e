//! Route parameters for resource helpers.
//!
//! [`Params`] tells the resource helpers whether a request addresses the
//! collection or one member of it. Bare scalars always mean "this id":
//!
//! ```
//! use testbed::params::Params;
//!
//! assert!(Params::from(1).is_single());
//! assert!(!Params::list().with("user", 1).is_single());
//! assert_eq!(Params::single(7).with("user", 1).id(), Some("7"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;

/// Parameter name that identifies a single resource.
pub const ID: &str = "id";

/// Named route parameter values.
pub type ParamBag = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    /// Addresses the collection; the bag fills any other template
    /// parameters (e.g. a parent resource).
    List(ParamBag),
    /// Addresses the member identified by `id`.
    Single { id: String, params: ParamBag },
}

impl Params {
    pub fn list() -> Self {
        Params::List(ParamBag::new())
    }

    pub fn single(id: impl Display) -> Self {
        Params::Single {
            id: id.to_string(),
            params: ParamBag::new(),
        }
    }

    /// Adds a named parameter. Setting `id` on a list turns it into a
    /// single-resource address.
    pub fn with(self, key: impl Into<String>, value: impl Display) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self {
            Params::List(params) if key == ID => Params::Single { id: value, params },
            Params::List(mut params) => {
                params.insert(key, value);
                Params::List(params)
            }
            Params::Single { id: _, params } if key == ID => Params::Single { id: value, params },
            Params::Single { id, mut params } => {
                params.insert(key, value);
                Params::Single { id, params }
            }
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Params::Single { .. })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Params::Single { id, .. } => Some(id),
            Params::List(_) => None,
        }
    }

    /// Flattens into one bag, with `id` set for single addresses.
    pub fn to_bag(&self) -> ParamBag {
        match self {
            Params::List(params) => params.clone(),
            Params::Single { id, params } => {
                let mut bag = params.clone();
                bag.insert(ID.to_string(), id.clone());
                bag
            }
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::list()
    }
}

/// A bag addresses a single resource iff it carries an `id` key.
impl From<ParamBag> for Params {
    fn from(mut params: ParamBag) -> Self {
        match params.remove(ID) {
            Some(id) => Params::Single { id, params },
            None => Params::List(params),
        }
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::list()
    }
}

macro_rules! single_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Params {
                fn from(id: $ty) -> Self {
                    Params::single(id)
                }
            }
        )*
    };
}

single_from!(u32, u64, i32, i64, usize, &str, String, &String, uuid::Uuid);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_are_single() {
        assert_eq!(Params::from(1).id(), Some("1"));
        assert_eq!(Params::from(42u64).id(), Some("42"));
        assert_eq!(Params::from("abc").id(), Some("abc"));
        assert_eq!(Params::from(String::from("x")).id(), Some("x"));

        let uuid = uuid::Uuid::new_v4();
        assert_eq!(Params::from(uuid).id(), Some(uuid.to_string().as_str()));
    }

    #[test]
    fn test_unit_and_default_are_list() {
        assert_eq!(Params::from(()), Params::List(ParamBag::new()));
        assert!(!Params::default().is_single());
    }

    #[test]
    fn test_bag_with_id_is_single() {
        let mut bag = ParamBag::new();
        bag.insert("user".into(), "1".into());
        bag.insert("id".into(), "2".into());

        let params = Params::from(bag);
        assert_eq!(params.id(), Some("2"));
        assert_eq!(params.to_bag().get("user").unwrap(), "1");
    }

    #[test]
    fn test_bag_without_id_is_list() {
        let mut bag = ParamBag::new();
        bag.insert("user".into(), "1".into());
        assert!(!Params::from(bag).is_single());
    }

    #[test]
    fn test_with_id_promotes_list() {
        let params = Params::list().with("user", 1).with("id", 9);
        assert_eq!(params.id(), Some("9"));

        let bag = params.to_bag();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("id").unwrap(), "9");
    }

    #[test]
    fn test_with_id_replaces_single_id() {
        let params = Params::single(1).with("id", 2);
        assert_eq!(params.id(), Some("2"));
    }
}
