//! Dot-notation paths into JSON records.
//!
//! `"email"`, `"contact.phone"`, and `"phones[].number"` are all valid paths.
//! A `[]` suffix expands into every element of an array.

use serde_json::Value;

/// Segments of a dot-notation field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// A parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a dot-notation path.
    ///
    /// `"orders[].card_number"` → `[Key("orders"), ArrayItem, Key("card_number")]`.
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        for part in path.split('.') {
            if let Some(key) = part.strip_suffix("[]") {
                if !key.is_empty() {
                    segments.push(PathSegment::Key(key.to_owned()));
                }
                segments.push(PathSegment::ArrayItem);
            } else {
                segments.push(PathSegment::Key(part.to_owned()));
            }
        }
        Self {
            raw: path.to_owned(),
            segments,
        }
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Call `visit` for every leaf this path reaches in `value`.
    ///
    /// A top-level key spelled exactly like the whole path (`"a.b"`,
    /// `"tags[]"`) takes precedence over the dotted reading, so flat records
    /// with such keys can still be targeted.
    ///
    /// The leaf is `None` when an object along the way lacks the key (or is
    /// not an object). Empty arrays produce no calls.
    pub fn for_each_leaf<E, F>(&self, value: &mut Value, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(Option<&mut Value>) -> Result<(), E>,
    {
        if let Some(child) = value
            .as_object_mut()
            .and_then(|map| map.get_mut(&self.raw))
        {
            return visit(Some(child));
        }
        walk(value, &self.segments, visit)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn walk<E, F>(value: &mut Value, segments: &[PathSegment], visit: &mut F) -> Result<(), E>
where
    F: FnMut(Option<&mut Value>) -> Result<(), E>,
{
    let Some((head, rest)) = segments.split_first() else {
        return visit(Some(value));
    };

    match head {
        PathSegment::Key(key) => match value.as_object_mut().and_then(|map| map.get_mut(key)) {
            Some(child) => walk(child, rest, visit),
            None => visit(None),
        },
        PathSegment::ArrayItem => match value.as_array_mut() {
            Some(items) => {
                for item in items.iter_mut() {
                    walk(item, rest, visit)?;
                }
                Ok(())
            }
            None => visit(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(path: &str, mut value: Value) -> Vec<Option<Value>> {
        let mut out = Vec::new();
        FieldPath::parse(path)
            .for_each_leaf::<(), _>(&mut value, &mut |leaf| {
                out.push(leaf.map(|v| v.clone()));
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn parse_flat() {
        let p = FieldPath::parse("email");
        assert_eq!(p.segments(), &[PathSegment::Key("email".into())]);
        assert_eq!(p.as_str(), "email");
    }

    #[test]
    fn parse_nested() {
        assert_eq!(FieldPath::parse("user.address.zip").segments().len(), 3);
    }

    #[test]
    fn parse_array() {
        let p = FieldPath::parse("orders[].card_number");
        assert_eq!(
            p.segments(),
            &[
                PathSegment::Key("orders".into()),
                PathSegment::ArrayItem,
                PathSegment::Key("card_number".into())
            ]
        );
    }

    #[test]
    fn leaf_at_flat_path() {
        let got = collect("email", json!({"email": "a@b.c", "name": "A"}));
        assert_eq!(got, vec![Some(json!("a@b.c"))]);
    }

    #[test]
    fn leaves_in_arrays() {
        let got = collect(
            "phones[].number",
            json!({"phones": [{"number": "1"}, {"number": "2"}, {"kind": "fax"}]}),
        );
        assert_eq!(got, vec![Some(json!("1")), Some(json!("2")), None]);
    }

    #[test]
    fn missing_key_reports_none() {
        assert_eq!(collect("contact.email", json!({"name": "Bob"})), vec![None]);
        assert_eq!(collect("contact.email", json!({"contact": 5})), vec![None]);
    }

    #[test]
    fn literal_key_wins_over_dotted_reading() {
        let got = collect(
            "contact.email",
            json!({"contact.email": "flat", "contact": {"email": "nested"}}),
        );
        assert_eq!(got, vec![Some(json!("flat"))]);
        assert_eq!(collect("tags[]", json!({"tags[]": "x"})), vec![Some(json!("x"))]);
        assert_eq!(
            collect("contact.email", json!({"contact": {"email": "nested"}})),
            vec![Some(json!("nested"))]
        );
    }

    #[test]
    fn visitor_can_mutate() {
        let mut value = json!({"user": {"note": "hi"}});
        FieldPath::parse("user.note")
            .for_each_leaf::<(), _>(&mut value, &mut |leaf| {
                if let Some(v) = leaf {
                    *v = json!("changed");
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(value["user"]["note"], "changed");
    }
}
