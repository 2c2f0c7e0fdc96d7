// Preference patch builder
//
// The daemon's PATCH /prefs endpoint takes a partial document in which
// every field being changed is accompanied by a `<Field>set: true` marker.
// Without the marker a `false` value is indistinguishable from "leave it
// alone", so patches are only ever built through this module.

use serde::Serialize;
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::Error;

/// Suffix of the companion marker field.
const SET_SUFFIX: &str = "set";

/// Preference fields the client is allowed to change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum PrefField {
    WantRunning,
    #[strum(serialize = "CorpDNS")]
    CorpDns,
    RouteAll,
    #[strum(serialize = "ExitNodeAllowLANAccess")]
    ExitNodeAllowLanAccess,
    ShieldsUp,
    #[strum(serialize = "RunSSH")]
    RunSsh,
    #[strum(serialize = "ExitNodeID")]
    ExitNodeId,
}

impl PrefField {
    /// Key used in the wire document.
    pub fn wire_name(self) -> &'static str {
        self.into()
    }

    /// Key of the companion `…set` marker.
    pub fn set_marker(self) -> String {
        format!("{}{SET_SUFFIX}", self.wire_name())
    }

    /// Reject values of the wrong JSON type before they reach the daemon.
    fn check_value(self, value: &Value) -> Result<(), Error> {
        let ok = match self {
            Self::ExitNodeId => value.is_string(),
            _ => value.is_boolean(),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidRequest(format!(
                "{self} expects a {}, got {value}",
                if self == Self::ExitNodeId { "string" } else { "boolean" }
            )))
        }
    }
}

/// A ready-to-send partial preference document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PrefsPatch(Map<String, Value>);

impl PrefsPatch {
    /// Build a patch from `(field name, new value)` pairs.
    ///
    /// Each pair contributes `Field: value` and `Fieldset: true`. Unknown
    /// field names fail with [`Error::UnsupportedField`].
    pub fn build<I, K>(changes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut patch = Self::default();
        for (name, value) in changes {
            let name = name.as_ref();
            let field: PrefField = name
                .parse()
                .map_err(|_| Error::UnsupportedField(name.to_owned()))?;
            patch.insert(field, value)?;
        }
        Ok(patch)
    }

    /// Patch for a single typed field.
    pub fn single(field: PrefField, value: impl Into<Value>) -> Result<Self, Error> {
        let mut patch = Self::default();
        patch.insert(field, value.into())?;
        Ok(patch)
    }

    fn insert(&mut self, field: PrefField, value: Value) -> Result<(), Error> {
        field.check_value(&value)?;
        self.0.insert(field.wire_name().to_owned(), value);
        self.0.insert(field.set_marker(), Value::Bool(true));
        Ok(())
    }

    /// Fields this patch changes, in wire order.
    pub fn fields(&self) -> impl Iterator<Item = PrefField> + '_ {
        self.0.keys().filter_map(|k| k.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn shields_up_patch_is_exact() {
        let patch = PrefsPatch::build([("ShieldsUp", json!(true))]).unwrap();
        assert_eq!(patch.to_json(), json!({"ShieldsUp": true, "ShieldsUpset": true}));
    }

    #[test]
    fn false_values_are_still_marked_set() {
        let patch = PrefsPatch::single(PrefField::CorpDns, false).unwrap();
        assert_eq!(patch.to_json(), json!({"CorpDNS": false, "CorpDNSset": true}));
    }

    #[test]
    fn multiple_fields_each_get_a_marker() {
        let patch = PrefsPatch::build([
            ("RouteAll", json!(true)),
            ("ExitNodeID", json!("n123")),
        ])
        .unwrap();
        assert_eq!(
            patch.to_json(),
            json!({
                "RouteAll": true,
                "RouteAllset": true,
                "ExitNodeID": "n123",
                "ExitNodeIDset": true
            })
        );
        let fields: Vec<_> = patch.fields().collect();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = PrefsPatch::build([("Hostname", json!("box"))]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedField(ref f) if f == "Hostname"));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let err = PrefsPatch::single(PrefField::ShieldsUp, "yes").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let err = PrefsPatch::single(PrefField::ExitNodeId, true).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn every_field_round_trips_its_wire_name() {
        for field in PrefField::iter() {
            let parsed: PrefField = field.wire_name().parse().unwrap();
            assert_eq!(parsed, field);
        }
        assert_eq!(PrefField::RunSsh.set_marker(), "RunSSHset");
    }
}
