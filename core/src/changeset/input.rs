use crate::value::Value;

/// A value supplied for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Value(Value),
    /// Document for a JSON column.
    Json(serde_json::Value),
    /// Sub-fields of an embedded relation.
    Relation(Fields),
}

macro_rules! impl_input_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Input {
                #[inline]
                fn from(value: $ty) -> Self {
                    Input::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_input_from!(i32, i64, u32, f64, bool, String, &str, Vec<u8>);

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}

impl From<serde_json::Value> for Input {
    fn from(value: serde_json::Value) -> Self {
        Input::Json(value)
    }
}

impl From<Fields> for Input {
    fn from(value: Fields) -> Self {
        Input::Relation(value)
    }
}

/// Ordered column → input list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Input)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, input: impl Into<Input>) -> Self {
        self.0.push((name.into(), input.into()));
        self
    }

    pub fn json(mut self, name: impl Into<String>, document: serde_json::Value) -> Self {
        self.0.push((name.into(), Input::Json(document)));
        self
    }

    pub fn relation(mut self, name: impl Into<String>, fields: Fields) -> Self {
        self.0.push((name.into(), Input::Relation(fields)));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, input: impl Into<Input>) {
        self.0.push((name.into(), input.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.0.iter().map(|(name, input)| (name.as_str(), input))
    }
}

impl IntoIterator for Fields {
    type Item = (String, Input);
    type IntoIter = std::vec::IntoIter<(String, Input)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<N: Into<String>, I: Into<Input>> FromIterator<(N, I)> for Fields {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        Fields(
            iter.into_iter()
                .map(|(name, input)| (name.into(), input.into()))
                .collect(),
        )
    }
}

/// A struct-shaped request whose fields are named `<EntityName><ColumnName>`.
///
/// Sub-messages for embedded relations are returned as [`Input::Relation`]
/// with names prefixed by the related entity's type name.
pub trait Message {
    fn fields(&self) -> Fields;
}

/// How input names map onto column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// Names are bare column names.
    Bare,
    /// Names carry the entity type name as a prefix.
    Prefixed,
}

impl Naming {
    pub(crate) fn column<'n>(self, entity: &str, name: &'n str) -> Option<&'n str> {
        match self {
            Naming::Bare => Some(name),
            Naming::Prefixed => name.strip_prefix(entity).filter(|rest| !rest.is_empty()),
        }
    }
}
