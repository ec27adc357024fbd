//! 请求字段校验
//!
//! 所有违反的约束一次性收集，按字段分组返回，不在第一个错误处中止。

use serde_json::Value;

use super::types::{CaptionInput, CaptionLength, Language, RawCaptionRequest, ValidationErrors};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";

pub const DEFAULT_VIBE: u8 = 50;

/// 校验原始请求，返回规范化字段或全部字段错误
pub fn validate(raw: &RawCaptionRequest) -> Result<CaptionInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let event_name = string_field(&mut errors, "eventName", raw.event_name.as_ref(), BLANK);
    if let Some(name) = &event_name {
        let len = name.chars().count();
        if len < 3 {
            errors.add("eventName", "Event name must be at least 3 characters long");
        }
        if len > 500 {
            errors.add("eventName", "Event name cannot exceed 500 characters");
        }
        if !name.chars().any(char::is_alphanumeric) {
            errors.add(
                "eventName",
                "Event name must contain at least some alphanumeric characters",
            );
        }
    }

    let event_type = string_field(
        &mut errors,
        "eventType",
        raw.event_type.as_ref(),
        "Event type is required",
    );
    if let Some(t) = &event_type {
        if t.chars().count() > 100 {
            errors.add("eventType", "Event type cannot exceed 100 characters");
        }
    }

    let location = string_field(&mut errors, "location", raw.location.as_ref(), BLANK);
    if let Some(loc) = &location {
        let len = loc.chars().count();
        if len < 2 {
            errors.add("location", "Location must be at least 2 characters long");
        }
        if len > 200 {
            errors.add("location", "Location cannot exceed 200 characters");
        }
    }

    let speakers = string_field(&mut errors, "speakers", raw.speakers.as_ref(), BLANK);
    if let Some(s) = &speakers {
        if s.chars().count() < 2 {
            errors.add("speakers", "Please mention at least some key people involved");
        }
    }

    let key_learnings = string_field(&mut errors, "keyLearnings", raw.key_learnings.as_ref(), BLANK);
    if let Some(k) = &key_learnings {
        if k.chars().count() < 10 {
            errors.add(
                "keyLearnings",
                "Please provide more detailed highlights (at least 10 characters)",
            );
        }
        if k.split_whitespace().count() < 3 {
            errors.add(
                "keyLearnings",
                "Please provide more detailed highlights with at least 3 words",
            );
        }
    }

    let length = choice_field(
        &mut errors,
        "length",
        raw.length.as_ref(),
        CaptionLength::parse,
        CaptionLength::default(),
    );
    let language = choice_field(
        &mut errors,
        "language",
        raw.language.as_ref(),
        Language::parse,
        Language::default(),
    );
    let vibe = vibe_field(&mut errors, raw.vibe.as_ref());

    if !errors.is_empty() {
        return Err(errors);
    }

    // 无错误时以下字段必然存在
    match (event_name, event_type, location, speakers, key_learnings, length, language, vibe) {
        (
            Some(event_name),
            Some(event_type),
            Some(location),
            Some(speakers),
            Some(key_learnings),
            Some(length),
            Some(language),
            Some(vibe),
        ) => Ok(CaptionInput {
            event_name,
            event_type,
            location,
            speakers,
            key_learnings,
            length,
            vibe,
            language,
        }),
        _ => {
            errors.add(super::types::NON_FIELD_ERRORS, "Invalid input data");
            Err(errors)
        }
    }
}

/// 必填字符串字段：去除首尾空白，数字按字符串接受
fn string_field(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&Value>,
    blank_message: &str,
) -> Option<String> {
    let text = match value {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            return None;
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            errors.add(field, NOT_A_STRING);
            return None;
        }
    };
    if text.is_empty() {
        errors.add(field, blank_message);
        return None;
    }
    Some(text)
}

/// 可选枚举字段，缺省时使用默认值
fn choice_field<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&Value>,
    parse: fn(&str) -> Option<T>,
    default: T,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => Some(default),
        Some(Value::String(s)) => match parse(s.trim()) {
            Some(v) => Some(v),
            None => {
                errors.add(field, format!("\"{}\" is not a valid choice.", s));
                None
            }
        },
        Some(other) => {
            errors.add(field, format!("\"{}\" is not a valid choice.", other));
            None
        }
    }
}

/// vibe：整数或整数字符串，范围 [0, 100]，缺省 50
fn vibe_field(errors: &mut ValidationErrors, value: Option<&Value>) -> Option<u8> {
    let parsed: Option<i64> = match value {
        None | Some(Value::Null) => return Some(DEFAULT_VIBE),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => strip_zero_fraction(s.trim()).parse::<i64>().ok(),
        Some(_) => None,
    };

    let Some(vibe) = parsed else {
        errors.add("vibe", "A valid integer is required.");
        return None;
    };

    if vibe < 0 {
        errors.add("vibe", "Ensure this value is greater than or equal to 0.");
        return None;
    }
    if vibe > 100 {
        errors.add("vibe", "Ensure this value is less than or equal to 100.");
        return None;
    }
    u8::try_from(vibe).ok()
}

/// "75.0" / "75." 视为整数 "75"
fn strip_zero_fraction(s: &str) -> &str {
    match s.split_once('.') {
        Some((int, frac)) if frac.chars().all(|c| c == '0') => int,
        _ => s,
    }
}
