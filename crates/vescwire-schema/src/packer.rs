use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::catalog::SchemaCatalog;
use crate::error::{Result, SchemaError};
use crate::field::{FieldKind, FieldSpec};
use crate::message::{Message, Value};

/// Encode a message into a payload.
///
/// The id byte is always written. With `header_only` nothing else is,
/// which is how getter requests travel; otherwise every field must be set
/// and is appended in schema order.
pub fn pack(message: &Message, header_only: bool) -> Result<Bytes> {
    let schema = message.schema();
    let mut buf = BytesMut::with_capacity(schema.fixed_len().unwrap_or(64));
    buf.put_u8(schema.id);
    if header_only {
        return Ok(buf.freeze());
    }

    for (index, spec) in schema.fields.iter().enumerate() {
        let value = message
            .value_at(index)
            .ok_or(SchemaError::FieldMissing(spec.name))?;
        encode_field(spec, value, &mut buf)?;
    }
    Ok(buf.freeze())
}

fn encode_field(spec: &FieldSpec, value: &Value, buf: &mut BytesMut) -> Result<()> {
    if spec.kind == FieldKind::Str {
        let text = value.as_str().ok_or(SchemaError::TypeMismatch {
            field: spec.name,
            expected: "a string",
        })?;
        buf.put_slice(text.as_bytes());
        return Ok(());
    }

    let raw = to_raw(spec, value)?;
    match spec.kind {
        FieldKind::Int8 => buf.put_i8(raw as i8),
        FieldKind::Int16 => buf.put_i16(raw as i16),
        FieldKind::Int32 | FieldKind::Float32 => buf.put_i32(raw as i32),
        FieldKind::Str => {}
    }
    Ok(())
}

/// Scaled, rounded and range-checked integer for a numeric field.
fn to_raw(spec: &FieldSpec, value: &Value) -> Result<i64> {
    let out_of_range = |value: f64| SchemaError::FieldRange {
        field: spec.name,
        value,
        kind: spec.kind,
    };

    let raw = match (value, spec.conversion_scale()) {
        (Value::Str(_), _) => {
            return Err(SchemaError::TypeMismatch {
                field: spec.name,
                expected: "a number",
            })
        }
        (Value::Int(v), None) => *v,
        (value, scale) => {
            let v = value.as_f64().unwrap_or(f64::NAN);
            let scaled = (v * scale.unwrap_or(1.0)).round();
            if !scaled.is_finite() || scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
                return Err(out_of_range(v));
            }
            scaled as i64
        }
    };

    match spec.kind.raw_range() {
        Some((min, max)) if raw < min || raw > max => {
            Err(out_of_range(value.as_f64().unwrap_or(f64::NAN)))
        }
        _ => Ok(raw),
    }
}

/// Decode a payload using the catalog's schema for its id byte.
///
/// Scaled fields come back as floats (`raw / scale`), unscaled integers
/// unchanged, and a trailing string takes every remaining byte. Bytes past
/// a fixed layout are ignored.
pub fn unpack(payload: &[u8], catalog: &SchemaCatalog) -> Result<Message> {
    let (&id, mut rest) = payload.split_first().ok_or(SchemaError::EmptyPayload)?;
    let schema = *catalog.get(id).ok_or(SchemaError::UnknownMessageId(id))?;
    let mut message = Message::new(schema);

    for (index, spec) in schema.fields.iter().enumerate() {
        let value = match spec.kind.width() {
            None => {
                let text = String::from_utf8_lossy(rest).into_owned();
                rest = &[];
                Value::Str(text)
            }
            Some(width) if rest.len() < width => {
                return Err(SchemaError::MalformedPayload {
                    schema: schema.name,
                    field: spec.name,
                    needed: width,
                    available: rest.len(),
                });
            }
            Some(_) => {
                let raw = match spec.kind {
                    FieldKind::Int8 => i64::from(rest.get_i8()),
                    FieldKind::Int16 => i64::from(rest.get_i16()),
                    _ => i64::from(rest.get_i32()),
                };
                match spec.conversion_scale() {
                    Some(scale) => Value::Float(raw as f64 / scale),
                    None => Value::Int(raw),
                }
            }
        };
        message.set_at(index, value);
    }

    if !rest.is_empty() {
        trace!(
            message = schema.name,
            extra = rest.len(),
            "ignoring trailing payload bytes"
        );
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, FieldSet};
    use crate::field::{FieldKind, MessageSchema};
    use crate::ids;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::standard(FieldSet::Current).unwrap()
    }

    /// Fill every field with an in-range value and return the value decoding should yield.
    fn sample_message(schema: MessageSchema) -> (Message, Vec<Value>) {
        let mut message = Message::new(schema);
        let mut expected = Vec::new();
        for (i, spec) in schema.fields.iter().enumerate() {
            let i = i as i64;
            let raw = match spec.kind {
                FieldKind::Int8 => i % 50 - 25,
                FieldKind::Int16 => -1234 + 17 * i,
                FieldKind::Int32 | FieldKind::Float32 => 123_456 - 7_919 * i,
                FieldKind::Str => {
                    let text = format!("{} output {i}", schema.name);
                    message.set(spec.name, text.as_str()).unwrap();
                    expected.push(Value::Str(text));
                    continue;
                }
            };
            let value = match spec.conversion_scale() {
                Some(scale) => Value::Float(raw as f64 / scale),
                None => Value::Int(raw),
            };
            message.set(spec.name, value.clone()).unwrap();
            expected.push(value);
        }
        (message, expected)
    }

    #[test]
    fn every_builtin_schema_survives_pack_and_unpack() {
        let layouts = [
            (FieldSet::Current, catalog::GET_VALUES),
            (FieldSet::PreV3, catalog::GET_VALUES_PRE_V3),
        ];
        for (field_set, values_schema) in layouts {
            let decoder = SchemaCatalog::standard(field_set).unwrap();
            let schemas = catalog::FIXED_SCHEMAS.iter().copied().chain([values_schema]);
            for schema in schemas {
                let (message, expected) = sample_message(schema);
                let payload = pack(&message, false).unwrap();
                if let Some(len) = schema.fixed_len() {
                    assert_eq!(payload.len(), len, "{}", schema.name);
                }

                let decoded = unpack(&payload, &decoder).unwrap();
                assert_eq!(decoded.id(), schema.id);
                assert_eq!(decoded.name(), schema.name);
                for (spec, want) in schema.fields.iter().zip(&expected) {
                    assert_eq!(
                        decoded.get(spec.name),
                        Some(want),
                        "{}.{}",
                        schema.name,
                        spec.name
                    );
                }
            }
        }
    }

    #[test]
    fn scaled_current_encodes_rounded_integer() {
        let msg = Message::with(catalog::SET_CURRENT, [("current", 1.5)]).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(payload.as_ref(), &[0x06, 0x00, 0x00, 0x05, 0xDC]);

        let decoded = unpack(&payload, &catalog()).unwrap();
        assert_eq!(decoded.get("current"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn rounding_goes_to_nearest() {
        let msg = Message::with(catalog::SET_DUTY, [("duty_cycle", 0.123456)]).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(&payload[1..], &12346i32.to_be_bytes());
    }

    #[test]
    fn negative_values_use_twos_complement() {
        let msg = Message::with(catalog::SET_SERVO_POS, [("servo_pos", -0.5)]).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(payload.as_ref(), &[0x0C, 0xFE, 0x0C]);

        let decoded = unpack(&payload, &catalog()).unwrap();
        assert_eq!(decoded.get_f64("servo_pos"), Some(-0.5));
    }

    #[test]
    fn unscaled_integer_passes_through() {
        let msg = Message::with(catalog::SET_RPM, [("rpm", 3920)]).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(payload.as_ref(), &[0x08, 0x00, 0x00, 0x0F, 0x50]);
        assert_eq!(
            unpack(&payload, &catalog()).unwrap().get("rpm"),
            Some(&Value::Int(3920))
        );
    }

    #[test]
    fn float_on_unscaled_field_is_rounded() {
        let msg = Message::with(catalog::SET_RPM, [("rpm", 99.6)]).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(&payload[1..], &100i32.to_be_bytes());
    }

    #[test]
    fn float32_kind_always_decodes_to_float() {
        let msg = Message::with(catalog::GPD_FILL_BUFFER, [("sample", 7)]).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(payload.len(), 5);
        assert_eq!(
            unpack(&payload, &catalog()).unwrap().get("sample"),
            Some(&Value::Float(7.0))
        );
    }

    #[test]
    fn missing_field_rejected() {
        let msg = Message::new(catalog::SET_CURRENT);
        let err = pack(&msg, false).unwrap_err();
        assert!(matches!(err, SchemaError::FieldMissing("current")));
    }

    #[test]
    fn header_only_request_is_id_byte() {
        let msg = Message::new(catalog::GET_VALUES);
        assert_eq!(pack(&msg, true).unwrap().as_ref(), &[ids::GET_VALUES]);

        let alive = Message::new(catalog::ALIVE);
        assert_eq!(pack(&alive, false).unwrap().as_ref(), &[ids::ALIVE]);
    }

    #[test]
    fn overflow_after_scaling_rejected() {
        // 40 A * 1000 fits int32; 3 million A does not.
        let ok = Message::with(catalog::SET_CURRENT, [("current", 40.0)]).unwrap();
        assert!(pack(&ok, false).is_ok());

        let big = Message::with(catalog::SET_CURRENT, [("current", 3.0e6)]).unwrap();
        assert!(matches!(
            pack(&big, false).unwrap_err(),
            SchemaError::FieldRange {
                field: "current",
                ..
            }
        ));

        let servo = Message::with(catalog::SET_SERVO_POS, [("servo_pos", 40.0)]).unwrap();
        assert!(matches!(
            pack(&servo, false).unwrap_err(),
            SchemaError::FieldRange { .. }
        ));

        let detect = Message::with(catalog::SET_DETECT, [("pos_mode", 128)]).unwrap();
        assert!(pack(&detect, false).is_err());
    }

    #[test]
    fn non_finite_values_rejected() {
        let nan = Message::with(catalog::SET_CURRENT, [("current", f64::NAN)]).unwrap();
        assert!(matches!(
            pack(&nan, false).unwrap_err(),
            SchemaError::FieldRange { .. }
        ));
        let inf = Message::with(catalog::SET_RPM, [("rpm", f64::INFINITY)]).unwrap();
        assert!(pack(&inf, false).is_err());
    }

    #[test]
    fn type_mismatch_rejected() {
        let msg = Message::with(catalog::SET_RPM, [("rpm", "fast")]).unwrap();
        assert!(matches!(
            pack(&msg, false).unwrap_err(),
            SchemaError::TypeMismatch { field: "rpm", .. }
        ));

        let msg = Message::with(catalog::TERMINAL_CMD, [("cmd", 5)]).unwrap();
        assert!(matches!(
            pack(&msg, false).unwrap_err(),
            SchemaError::TypeMismatch { field: "cmd", .. }
        ));
    }

    #[test]
    fn string_field_has_no_length_prefix() {
        let msg = Message::with(catalog::TERMINAL_CMD, [("cmd", "foc_openloop 5 1200")]).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(payload[0], ids::TERMINAL_CMD);
        assert_eq!(&payload[1..], b"foc_openloop 5 1200");

        let decoded = unpack(&payload, &catalog()).unwrap();
        assert_eq!(decoded.get_str("cmd"), Some("foc_openloop 5 1200"));
    }

    #[test]
    fn string_after_fixed_fields_takes_the_rest() {
        const TAGGED: MessageSchema = MessageSchema::new(
            200,
            "TAGGED",
            &[FieldSpec::int16("tag"), FieldSpec::string("text")],
        );
        let mut cat = catalog();
        cat.register(TAGGED).unwrap();

        let decoded = unpack(&[200, 0x01, 0x02, b'o', b'k'], &cat).unwrap();
        assert_eq!(decoded.get_i64("tag"), Some(0x0102));
        assert_eq!(decoded.get_str("text"), Some("ok"));

        let empty = unpack(&[200, 0x00, 0x01], &cat).unwrap();
        assert_eq!(empty.get_str("text"), Some(""));
    }

    #[test]
    fn unknown_id_rejected() {
        let err = unpack(&[0xEE, 1, 2], &catalog()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownMessageId(0xEE)));
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(
            unpack(&[], &catalog()).unwrap_err(),
            SchemaError::EmptyPayload
        ));
    }

    #[test]
    fn truncated_payload_rejected() {
        let err = unpack(&[ids::SET_CURRENT, 0x00, 0x00], &catalog()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MalformedPayload {
                field: "current",
                needed: 4,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn firmware_version_tolerates_trailing_bytes() {
        let decoded = unpack(&[ids::FW_VERSION, 3, 40, b'H', b'W'], &catalog()).unwrap();
        assert_eq!(decoded.get_i64("major"), Some(3));
        assert_eq!(decoded.get_i64("minor"), Some(40));
    }

    #[test]
    fn measurement_snapshot_round_trips() {
        let values: [(&str, f64); 19] = [
            ("temp_fet", 31.5),
            ("temp_motor", 28.1),
            ("avg_motor_current", 2.25),
            ("avg_input_current", 0.75),
            ("avg_id", -0.12),
            ("avg_iq", 2.2),
            ("duty_cycle_now", 0.153),
            ("rpm", 4200.0),
            ("v_in", 24.3),
            ("amp_hours", 0.0123),
            ("amp_hours_charged", 0.0004),
            ("watt_hours", 0.2984),
            ("watt_hours_charged", 0.0097),
            ("tachometer", 1500.0),
            ("tachometer_abs", 1620.0),
            ("mc_fault_code", 0.0),
            ("pid_pos_now", 182.523611),
            ("app_controller_id", 1.0),
            ("time_ms", 52000.0),
        ];
        let msg = Message::with(catalog::GET_VALUES, values).unwrap();
        let payload = pack(&msg, false).unwrap();
        assert_eq!(Some(payload.len()), catalog::GET_VALUES.fixed_len());

        let decoded = unpack(&payload, &catalog()).unwrap();
        for (name, expected) in values {
            let actual = decoded.get_f64(name).unwrap();
            assert!((actual - expected).abs() < 1e-9, "{name}: {actual} != {expected}");
        }
        assert_eq!(decoded.get("rpm"), Some(&Value::Int(4200)));
    }

    #[test]
    fn pre_v3_catalog_decodes_old_layout() {
        let old = SchemaCatalog::standard(FieldSet::PreV3).unwrap();
        let mut payload = vec![ids::GET_VALUES];
        payload.extend_from_slice(&[0x01, 0x2C].repeat(7));
        payload.resize(catalog::GET_VALUES_PRE_V3.fixed_len().unwrap(), 0);

        let decoded = unpack(&payload, &old).unwrap();
        assert_eq!(decoded.get_f64("temp_pcb"), Some(30.0));
        assert!(decoded.get("temp_fet").is_none());

        assert!(matches!(
            unpack(&payload, &catalog()).unwrap_err(),
            SchemaError::MalformedPayload { .. }
        ));
    }
}
