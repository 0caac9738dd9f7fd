//! Serde helpers for amounts.
//!
//! Amounts are arbitrary precision integers. They are written as decimal strings so that YAML
//! and JSON documents stay readable and no precision is lost in a float round trip.

pub mod biguint_string {
    use std::str::FromStr;

    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let value = String::deserialize(deserializer)?;
        BigUint::from_str(value.trim()).map_err(serde::de::Error::custom)
    }
}

pub mod biguint_string_vec {
    use std::str::FromStr;

    use num_bigint::BigUint;
    use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<BigUint>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|value| BigUint::from_str(value.trim()).map_err(serde::de::Error::custom))
            .collect()
    }
}
