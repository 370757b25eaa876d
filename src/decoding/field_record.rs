/// Ordered `(display name, value)` pairs decoded from one event.
///
/// Names are not unique: a multi-row field may contribute the same display
/// name more than once and every pair is kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    fields: Vec<(String, String)>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    /// Value of the first pair named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

impl Extend<(String, String)> for FieldRecord {
    fn extend<T: IntoIterator<Item = (String, String)>>(&mut self, iter: T) {
        self.fields.extend(iter);
    }
}

impl IntoIterator for FieldRecord {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
