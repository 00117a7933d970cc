//! Request-scoped session state with dot-notated paths.

use serde_json::{Map, Value};

/// Session data for one request.
///
/// Paths such as `"auth.user.role"` address nested objects. The application
/// loads the tree from its session backend before handling the request and
/// writes it back afterwards; this type only holds the values in between.
///
/// # Examples
///
/// ```
/// use request_guard::Session;
/// use serde_json::json;
///
/// let mut session = Session::new();
/// session.set("auth.user.id", json!(12));
///
/// assert_eq!(session.get("auth.user.id"), Some(&json!(12)));
/// assert!(session.get("auth.user.role").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    root: Map<String, Value>,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session from a stored tree.
    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Returns the tree for persisting.
    pub fn into_map(self) -> Map<String, Value> {
        self.root
    }

    /// Looks up a dot-notated path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.root.get(first)?, |node, segment| node.as_object()?.get(segment))
    }

    /// Looks up a path holding an integer.
    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Sets a dot-notated path, creating intermediate objects.
    ///
    /// A non-object value in the way is replaced by an object.
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut node = &mut self.root;
        for segment in parents {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            node = map;
        }
        node.insert(last.to_string(), value);
    }

    /// Removes a path and returns its value.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };

        let map = match parent {
            None => &mut self.root,
            Some(parent) => {
                let mut node = &mut self.root;
                for segment in parent.split('.') {
                    node = node.get_mut(segment)?.as_object_mut()?;
                }
                node
            }
        };
        map.remove(last)
    }
}
