//! Field-level validation of scanner JSON
//!
//! Every parser here walks a `serde_json::Value` and either builds the typed
//! model or fails with the dotted path of the first offending field
//! (`issues[3].severity`). Nothing is silently dropped or coerced, with two
//! transport exceptions: list fields may arrive as serialized JSON text, and
//! an empty JSON object stands for an empty list because Lua cannot tell the
//! two apart.

use crate::model::{Addon, Exploit, Issue, PerformanceProfile, ProfileEntry, ScannedFile};
use crate::Severity;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Which field failed and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn required(field: String) -> Self {
        Self::new(field, "is required")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Typed accessor over one JSON object that remembers where it sits
pub struct Fields<'a> {
    obj: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value, path: &str) -> ValidationResult<Self> {
        match value {
            Value::Object(obj) => Ok(Self {
                obj,
                path: path.to_string(),
            }),
            other => Err(ValidationError::new(
                if path.is_empty() { "body" } else { path },
                format!("expected an object, got {}", kind(other)),
            )),
        }
    }

    pub fn path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key).filter(|value| !value.is_null())
    }

    fn require(&self, key: &str) -> ValidationResult<&'a Value> {
        self.get(key)
            .ok_or_else(|| ValidationError::required(self.path(key)))
    }

    pub fn string(&self, key: &str) -> ValidationResult<String> {
        self.optional_string(key)?
            .ok_or_else(|| ValidationError::required(self.path(key)))
    }

    pub fn optional_string(&self, key: &str) -> ValidationResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ValidationError::new(
                self.path(key),
                format!("expected a string, got {}", kind(other)),
            )),
        }
    }

    /// First present key wins; a missing value is reported under `keys[0]`
    pub fn string_alias(&self, keys: &[&str]) -> ValidationResult<String> {
        for key in keys {
            if let Some(value) = self.optional_string(key)? {
                return Ok(value);
            }
        }
        Err(ValidationError::required(self.path(keys[0])))
    }

    pub fn unsigned(&self, key: &str, min: u64) -> ValidationResult<u64> {
        let value = self.require(key)?;
        self.check_unsigned(key, value, min)
    }

    pub fn optional_unsigned(&self, key: &str, min: u64) -> ValidationResult<Option<u64>> {
        self.get(key)
            .map(|value| self.check_unsigned(key, value, min))
            .transpose()
    }

    /// Unsigned integer that may also arrive as decimal text, as form-encoded
    /// chunk metadata does
    pub fn unsigned_text(&self, key: &str, min: u64) -> ValidationResult<u64> {
        match self.require(key)? {
            Value::String(text) => {
                let n = text.trim().parse::<u64>().map_err(|_| {
                    ValidationError::new(
                        self.path(key),
                        format!("expected a non-negative integer, got {:?}", text),
                    )
                })?;
                self.check_min(key, n, min)
            }
            value => self.check_unsigned(key, value, min),
        }
    }

    pub fn count(&self, key: &str, min: u64) -> ValidationResult<u32> {
        let n = self.unsigned(key, min)?;
        self.narrow(key, n)
    }

    pub fn optional_count(&self, key: &str, min: u64) -> ValidationResult<Option<u32>> {
        self.optional_unsigned(key, min)?
            .map(|n| self.narrow(key, n))
            .transpose()
    }

    pub fn integer(&self, key: &str) -> ValidationResult<i64> {
        let value = self.require(key)?;
        self.check_integer(key, value)
    }

    pub fn optional_integer(&self, key: &str) -> ValidationResult<Option<i64>> {
        self.get(key)
            .map(|value| self.check_integer(key, value))
            .transpose()
    }

    pub fn number(&self, key: &str) -> ValidationResult<f64> {
        match self.require(key)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| {
                ValidationError::new(self.path(key), "is not a finite number")
            }),
            other => Err(ValidationError::new(
                self.path(key),
                format!("expected a number, got {}", kind(other)),
            )),
        }
    }

    pub fn optional_bool(&self, key: &str) -> ValidationResult<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(ValidationError::new(
                self.path(key),
                format!("expected a boolean, got {}", kind(other)),
            )),
        }
    }

    pub fn severity(&self, key: &str) -> ValidationResult<Severity> {
        let raw = self.string(key)?;
        raw.parse()
            .map_err(|message: String| ValidationError::new(self.path(key), message))
    }

    /// List field, accepted as a JSON array or as its serialized text.
    /// An absent optional list is empty.
    pub fn list<T, F>(&self, key: &str, required: bool, parse: F) -> ValidationResult<Vec<T>>
    where
        F: Fn(&Value, &str) -> ValidationResult<T>,
    {
        let path = self.path(key);
        let raw = match self.get(key) {
            Some(Value::String(text)) if text.trim().is_empty() => None,
            other => other,
        };
        let Some(raw) = raw else {
            return if required {
                Err(ValidationError::required(path))
            } else {
                Ok(Vec::new())
            };
        };

        let lifted = lift_serialized(raw, &path)?;
        let items: &[Value] = match &*lifted {
            Value::Array(items) => items,
            Value::Object(obj) if obj.is_empty() => &[],
            other => {
                return Err(ValidationError::new(
                    path,
                    format!("expected an array, got {}", kind(other)),
                ))
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| parse(item, &format!("{}[{}]", path, index)))
            .collect()
    }

    /// Nested object field, accepted as JSON or as its serialized text
    pub fn optional_object<T, F>(&self, key: &str, parse: F) -> ValidationResult<Option<T>>
    where
        F: Fn(&Value, &str) -> ValidationResult<T>,
    {
        let path = self.path(key);
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(raw) => {
                let lifted = lift_serialized(raw, &path)?;
                parse(&lifted, &path).map(Some)
            }
        }
    }

    fn check_unsigned(&self, key: &str, value: &Value, min: u64) -> ValidationResult<u64> {
        let n = as_unsigned(value).ok_or_else(|| {
            ValidationError::new(
                self.path(key),
                format!("expected a non-negative integer, got {}", describe(value)),
            )
        })?;
        self.check_min(key, n, min)
    }

    fn check_min(&self, key: &str, n: u64, min: u64) -> ValidationResult<u64> {
        if n < min {
            Err(ValidationError::new(
                self.path(key),
                format!("must be at least {}, got {}", min, n),
            ))
        } else {
            Ok(n)
        }
    }

    fn check_integer(&self, key: &str, value: &Value) -> ValidationResult<i64> {
        as_integer(value).ok_or_else(|| {
            ValidationError::new(
                self.path(key),
                format!("expected an integer, got {}", describe(value)),
            )
        })
    }

    fn narrow(&self, key: &str, n: u64) -> ValidationResult<u32> {
        u32::try_from(n)
            .map_err(|_| ValidationError::new(self.path(key), format!("is too large: {}", n)))
    }
}

fn lift_serialized<'v>(value: &'v Value, path: &str) -> ValidationResult<Cow<'v, Value>> {
    match value {
        Value::String(text) => serde_json::from_str(text)
            .map(Cow::Owned)
            .map_err(|e| ValidationError::new(path, format!("contains invalid JSON: {}", e))),
        other => Ok(Cow::Borrowed(other)),
    }
}

fn as_unsigned(value: &Value) -> Option<u64> {
    let n = value.as_number()?;
    n.as_u64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn as_integer(value: &Value) -> Option<i64> {
    let n = value.as_number()?;
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        other => kind(other).to_string(),
    }
}

pub fn parse_issue(value: &Value, path: &str) -> ValidationResult<Issue> {
    let f = Fields::new(value, path)?;
    Ok(Issue {
        id: f.string("id")?,
        title: f.string("title")?,
        description: f.string("description")?,
        severity: f.severity("severity")?,
        occurrences: f.count("occurrences", 1)?,
        file_path: f.string("filePath")?,
        line_number: f.count("lineNumber", 1)?,
        code: f.string("code")?,
        recommendation: f.string("recommendation")?,
        documentation_url: f.optional_string("documentationUrl")?,
    })
}

/// Accepts both the `title`/`filePath` shape and the older `name`/`path` one
pub fn parse_exploit(value: &Value, path: &str) -> ValidationResult<Exploit> {
    let f = Fields::new(value, path)?;
    Ok(Exploit {
        id: f.string("id")?,
        title: f.string_alias(&["title", "name"])?,
        description: f.string("description")?,
        severity: f.severity("severity")?,
        file_path: f.string_alias(&["filePath", "path"])?,
        line_number: f.optional_count("lineNumber", 1)?,
        code: f.string("code")?,
        recommendation: f.string("recommendation")?,
    })
}

pub fn parse_file(value: &Value, path: &str) -> ValidationResult<ScannedFile> {
    let f = Fields::new(value, path)?;
    Ok(ScannedFile {
        path: f.string("path")?,
        addon: f.string("addon")?,
        file_type: f.string("type")?,
        size: f.unsigned("size", 0)?,
        issues: f.count("issues", 0)?,
    })
}

pub fn parse_addon(value: &Value, path: &str) -> ValidationResult<Addon> {
    let f = Fields::new(value, path)?;
    Ok(Addon {
        name: f.string("name")?,
        files: f.count("files", 0)?,
        issues: f.count("issues", 0)?,
    })
}

pub fn parse_profile_entry(value: &Value, path: &str) -> ValidationResult<ProfileEntry> {
    let f = Fields::new(value, path)?;
    Ok(ProfileEntry {
        func: f.string("func")?,
        name: f.optional_string("name")?,
        source: f.string("source")?,
        total_called: f.unsigned("total_called", 0)?,
        total_time: f.number("total_time")?,
        average_time: f.number("average_time")?,
        line_defined: f.integer("line_defined")?,
        line_last: f.optional_integer("line_last")?,
        is_c_func: f.optional_bool("is_c_func")?,
    })
}

pub fn parse_profile(value: &Value, path: &str) -> ValidationResult<PerformanceProfile> {
    let f = Fields::new(value, path)?;
    Ok(PerformanceProfile {
        most_time: f.list("most_time", true, parse_profile_entry)?,
        most_called: f.list("most_called", true, parse_profile_entry)?,
        most_avg_time: f.list("most_avg_time", true, parse_profile_entry)?,
        scan_duration: f.number("scan_duration")?,
        timestamp: f.string("timestamp")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_json() -> Value {
        json!({
            "id": "ISSUE_0001",
            "title": "player.GetAll() in Think hook",
            "description": "Gets all players",
            "severity": "warning",
            "occurrences": 2,
            "filePath": "addons/admin/lua/autorun/sv_admin.lua",
            "lineNumber": 14,
            "code": "for _, ply in ipairs(player.GetAll()) do",
            "recommendation": "Cache result outside loop or hook"
        })
    }

    #[test]
    fn test_parse_issue() {
        let issue = parse_issue(&issue_json(), "issues[0]").unwrap();
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.occurrences, 2);
        assert_eq!(issue.line_number, 14);
        assert_eq!(issue.documentation_url, None);
    }

    #[test]
    fn test_issue_bad_severity_names_field() {
        let mut value = issue_json();
        value["severity"] = json!("fatal");
        let err = parse_issue(&value, "issues[3]").unwrap_err();
        assert_eq!(err.field, "issues[3].severity");
        assert!(err.message.contains("fatal"));
    }

    #[test]
    fn test_issue_zero_occurrences_rejected() {
        let mut value = issue_json();
        value["occurrences"] = json!(0);
        let err = parse_issue(&value, "issues[0]").unwrap_err();
        assert_eq!(err.field, "issues[0].occurrences");
        assert_eq!(err.message, "must be at least 1, got 0");
    }

    #[test]
    fn test_issue_integral_float_accepted() {
        let mut value = issue_json();
        value["lineNumber"] = json!(14.0);
        assert_eq!(parse_issue(&value, "i").unwrap().line_number, 14);

        value["lineNumber"] = json!(14.5);
        let err = parse_issue(&value, "i").unwrap_err();
        assert_eq!(err.field, "i.lineNumber");
    }

    #[test]
    fn test_issue_numeric_text_not_coerced() {
        let mut value = issue_json();
        value["lineNumber"] = json!("14");
        let err = parse_issue(&value, "issues[0]").unwrap_err();
        assert_eq!(err.field, "issues[0].lineNumber");
    }

    #[test]
    fn test_missing_field_is_required() {
        let mut value = issue_json();
        value.as_object_mut().unwrap().remove("title");
        let err = parse_issue(&value, "issues[0]").unwrap_err();
        assert_eq!(err.to_string(), "issues[0].title: is required");
    }

    #[test]
    fn test_exploit_legacy_shape() {
        let value = json!({
            "id": "EXP_1",
            "name": "RunString with network input",
            "description": "Remote code execution",
            "severity": "critical",
            "path": "addons/x/lua/sv.lua",
            "code": "RunString(net.ReadString())",
            "recommendation": "Never execute client-provided strings"
        });
        let exploit = parse_exploit(&value, "exploits[0]").unwrap();
        assert_eq!(exploit.title, "RunString with network input");
        assert_eq!(exploit.file_path, "addons/x/lua/sv.lua");
        assert_eq!(exploit.line_number, None);
    }

    #[test]
    fn test_list_from_serialized_text() {
        let body = json!({ "issues": serde_json::to_string(&vec![issue_json()]).unwrap() });
        let f = Fields::new(&body, "").unwrap();
        let issues = f.list("issues", false, parse_issue).unwrap();
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_list_invalid_text() {
        let body = json!({ "files": "[{" });
        let f = Fields::new(&body, "").unwrap();
        let err = f.list("files", false, parse_file).unwrap_err();
        assert_eq!(err.field, "files");
        assert!(err.message.starts_with("contains invalid JSON"));
    }

    #[test]
    fn test_list_empty_lua_table() {
        let body = json!({ "addons": "{}", "files": "" });
        let f = Fields::new(&body, "").unwrap();
        assert!(f.list("addons", false, parse_addon).unwrap().is_empty());
        assert!(f.list("files", false, parse_file).unwrap().is_empty());
        assert!(f.list("exploits", false, parse_exploit).unwrap().is_empty());
        assert!(f.list("files", true, parse_file).is_err());
    }

    #[test]
    fn test_list_item_path() {
        let body = json!({ "addons": [{ "name": "a", "files": 1, "issues": 1 }, { "name": "b", "files": -1, "issues": 0 }] });
        let f = Fields::new(&body, "").unwrap();
        let err = f.list("addons", false, parse_addon).unwrap_err();
        assert_eq!(err.field, "addons[1].files");
    }

    #[test]
    fn test_unsigned_text() {
        let body = json!({ "totalChunks": "3", "currentChunk": 0, "bad": "x" });
        let f = Fields::new(&body, "").unwrap();
        assert_eq!(f.unsigned_text("totalChunks", 1).unwrap(), 3);
        assert!(f.unsigned_text("currentChunk", 1).is_err());
        assert!(f.unsigned_text("bad", 0).is_err());
    }

    #[test]
    fn test_profile() {
        let entry = json!({
            "func": "function: 0x1234",
            "source": "@lua/autorun/x.lua",
            "total_called": 1200,
            "total_time": 0.52,
            "average_time": 0.0004,
            "line_defined": -1,
            "is_c_func": true
        });
        let value = json!({
            "most_time": [entry.clone()],
            "most_called": [],
            "most_avg_time": [entry],
            "scan_duration": 10,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        let profile = parse_profile(&value, "performance").unwrap();
        assert_eq!(profile.most_time[0].line_defined, -1);
        assert_eq!(profile.scan_duration, 10.0);
    }

    #[test]
    fn test_not_an_object() {
        let err = Fields::new(&json!([1, 2]), "").err().unwrap();
        assert_eq!(err.field, "body");
    }
}
