use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Deserialize with JSON-path context in error messages. `origin` names the
/// source (a file path, `<stdin>`) in the error.
pub fn from_str_with_path<T: DeserializeOwned>(origin: &str, src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| located(origin, err))
}

pub fn from_slice_with_path<T: DeserializeOwned>(origin: &str, bytes: &[u8]) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| located(origin, err))
}

fn located(origin: &str, err: serde_path_to_error::Error<serde_json::Error>) -> Error {
    Error::Json {
        origin: origin.to_owned(),
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    }
}
