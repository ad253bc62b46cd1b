use std::ffi::{CStr, CString};

use nexus_telemetry::error::TelemetryError;
use nexus_telemetry::params;
use nexus_telemetry::value::{ParameterList, Quat, TaggedValue, TypeTag, Vec2, Vec3, MAX_PARAMS};

#[test]
fn test_scalar_round_trip() {
    assert_eq!(TaggedValue::from(-42i32).as_i32(), Some(-42));
    assert_eq!(TaggedValue::from(u32::MAX).as_u32(), Some(u32::MAX));
    assert_eq!(TaggedValue::from(i64::MIN).as_i64(), Some(i64::MIN));
    assert_eq!(TaggedValue::from(u64::MAX - 7).as_u64(), Some(u64::MAX - 7));
    assert_eq!(TaggedValue::from(1.25f32).as_f32(), Some(1.25));
    assert_eq!(TaggedValue::from(-3.5e300f64).as_f64(), Some(-3.5e300));

    // Bit-exact, including NaN payloads
    let nan = f32::from_bits(0x7fc0_1234);
    let read = TaggedValue::from(nan).as_f32().unwrap();
    assert_eq!(read.to_bits(), nan.to_bits());
}

#[test]
fn test_vector_round_trip() {
    let v2 = Vec2::new(1.0, -2.0);
    let v3 = Vec3::new(0.5, 1.5, 2.5);
    let q = Quat::new(0.7, 0.1, 0.2, 0.3);

    assert_eq!(TaggedValue::from(v2).as_vec2(), Some(v2));
    assert_eq!(TaggedValue::from(v3).as_vec3(), Some(v3));
    assert_eq!(TaggedValue::from(q).as_quat(), Some(q));
}

#[test]
fn test_sizes_match_tags() {
    let cases: Vec<(TaggedValue, TypeTag, u16)> = vec![
        (1i32.into(), TypeTag::Int32, 4),
        (1u32.into(), TypeTag::UInt32, 4),
        (1i64.into(), TypeTag::Int64, 8),
        (1u64.into(), TypeTag::UInt64, 8),
        (1f32.into(), TypeTag::Float, 4),
        (1f64.into(), TypeTag::Double, 8),
        (Vec2::default().into(), TypeTag::Vec2, 8),
        (Vec3::default().into(), TypeTag::Vec3, 12),
        (Quat::IDENTITY.into(), TypeTag::Quat, 16),
        (TaggedValue::nil(), TypeTag::Nil, 0),
    ];
    for (value, tag, size) in cases {
        assert_eq!(value.tag(), tag);
        assert_eq!(value.size(), size, "size mismatch for {:?}", tag);
        assert_eq!(value.payload().len(), size as usize);
    }
}

#[test]
fn test_string_size_asymmetry() {
    let c_str = CStr::from_bytes_with_nul(b"spawn\0").unwrap();
    let from_c = TaggedValue::from(c_str);
    let from_str = TaggedValue::from("spawn");

    // C strings carry their terminator, plain strings do not
    assert_eq!(from_c.tag(), TypeTag::String);
    assert_eq!(from_c.size(), 6);
    assert_eq!(from_c.payload(), b"spawn\0");
    assert_eq!(from_str.size(), 5);
    assert_eq!(from_str.payload(), b"spawn");

    // Same text, different encodings
    assert_ne!(from_c, from_str);
    assert_eq!(from_c.as_str(), Some("spawn"));
    assert_eq!(from_str.as_str(), Some("spawn"));

    let missing = TaggedValue::from(None::<&CStr>);
    assert_eq!(missing.tag(), TypeTag::String);
    assert_eq!(missing.size(), 0);

    let owned_c = TaggedValue::from(CString::new("spawn").unwrap());
    assert_eq!(owned_c, from_c);
}

#[test]
fn test_equality_rules() {
    let a = TaggedValue::from(5i32);
    let b = TaggedValue::new(5i32, false);
    assert_eq!(a, b, "changed flag does not take part in equality");

    // Same bytes, different tag
    assert_ne!(TaggedValue::from(5i32), TaggedValue::from(5u32));
    // Same tag, different payload
    assert_ne!(TaggedValue::from(5i32), TaggedValue::from(6i32));
    // Same tag, different size
    assert_ne!(TaggedValue::from("abc"), TaggedValue::from("abcd"));

    // Borrowed values over the same memory
    let text = String::from("shared");
    let x = TaggedValue::from(text.as_str());
    let y = x.clone();
    assert_eq!(x, y);
}

#[test]
fn test_storage_policies() {
    let text = String::from("borrowed");
    let borrowed = TaggedValue::from(text.as_str());
    assert!(!borrowed.is_owned());

    let owned = borrowed.clone().into_owned();
    assert!(owned.is_owned());
    assert_eq!(owned, borrowed);
    assert_ne!(owned.payload().as_ptr(), borrowed.payload().as_ptr());

    assert!(TaggedValue::from(String::from("mine")).is_owned());
    assert!(TaggedValue::from(3i32).is_owned());
}

#[test]
fn test_assign_keeps_changed_flag() {
    let mut value = TaggedValue::new(1i32, false);
    value.assign(2.5f32);
    assert_eq!(value.tag(), TypeTag::Float);
    assert_eq!(value.as_f32(), Some(2.5));
    assert!(!value.is_changed());

    value.set_changed(true);
    value.assign("done");
    assert!(value.is_changed());
    assert_eq!(value.as_str(), Some("done"));
}

#[test]
fn test_display_formats() {
    assert_eq!(TaggedValue::from(-7i32).to_string(), "-7");
    assert_eq!(TaggedValue::from(7u64).to_string(), "7");
    assert_eq!(TaggedValue::from(1.5f32).to_string(), "1.500000");
    assert_eq!(TaggedValue::from(Vec2::new(1.0, 2.0)).to_string(), "1.000000, 2.000000");
    assert_eq!(
        TaggedValue::from(Vec3::new(1.0, 2.0, 3.0)).to_string(),
        "1.000000, 2.000000, 3.000000"
    );
    assert_eq!(TaggedValue::from("hello").to_string(), "hello");
    assert_eq!(TaggedValue::nil().to_string(), "");
}

#[test]
fn test_from_raw_rebuilds_values() {
    let original = TaggedValue::from(Vec3::new(4.0, 5.0, 6.0));
    let rebuilt = TaggedValue::from_raw(TypeTag::Vec3, original.payload()).unwrap();
    assert_eq!(rebuilt, original);

    // Wrong width for a fixed-size tag
    assert!(TaggedValue::from_raw(TypeTag::Int32, &[1, 2]).is_none());
}

#[test]
fn test_parameter_list_basics() {
    let mut list = ParameterList::new();
    assert!(list.is_empty());
    assert!(list.any_changed(), "empty list always sends");

    list.push(TaggedValue::new(1i32, false)).unwrap();
    list.push(TaggedValue::new("name", false)).unwrap();
    assert_eq!(list.len(), 2);
    assert!(!list.any_changed());
    assert_eq!(list.type_tags(), vec![TypeTag::Int32, TypeTag::String]);
    assert_eq!(list.payload_len(), 4 + 4);

    list.push(TaggedValue::new(2.0f64, true)).unwrap();
    assert!(list.any_changed());
    assert_eq!(list[2].as_f64(), Some(2.0));
}

#[test]
fn test_params_macro_preserves_order() {
    let list = params![1i32, 2u32, "three", 4.0f32];
    assert_eq!(list.len(), 4);
    assert_eq!(list[0].as_i32(), Some(1));
    assert_eq!(list[1].as_u32(), Some(2));
    assert_eq!(list[2].as_str(), Some("three"));
    assert_eq!(list[3].as_f32(), Some(4.0));

    let empty = params![];
    assert_eq!(empty.len(), 0);
}

#[test]
fn test_params_macro_fills_whole_list() {
    let list = params![1i32, 2i32, 3i32, 4i32, 5i32, 6i32, 7i32, 8i32,];
    assert_eq!(list.len(), MAX_PARAMS);
    assert_eq!(list[7].as_i32(), Some(8));
}

#[test]
#[should_panic]
fn test_parameter_list_index_past_len() {
    let list = params![1i32];
    let _ = &list[1];
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "capacity exceeded"))]
fn test_parameter_list_rejects_ninth_value() {
    let mut list = ParameterList::new();
    for i in 0..MAX_PARAMS {
        list.push(i as i32).unwrap();
    }
    assert_eq!(list.len(), MAX_PARAMS);
    assert!(matches!(list.push(9i32), Err(TelemetryError::ParamCapacity)));
    assert_eq!(list.len(), MAX_PARAMS);
}
