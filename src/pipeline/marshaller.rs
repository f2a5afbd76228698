//! Payload Marshaller: copies a [`ClassDefinitionSet`] into a runtime-native `byte[][]`.

use tracing::{debug, trace};

use crate::{
    bundle::ClassDefinitionSet,
    runtime::{ExecutionEnvironment, ObjectArray, Runtime},
    Error, Result,
};

/// Descriptor of the outer array's element type.
const BYTE_ARRAY_DESCRIPTOR: &std::ffi::CStr = c"[B";

/// The marshalled `byte[][]`, ready to be passed to the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    /// The outer array
    pub array: ObjectArray,
    /// Number of elements, equal to the number of definitions
    pub len: usize,
}

/// Builds the outer array of inner byte arrays for `definitions`.
///
/// Element `i` of the outer array holds exactly the bytes of definition `i`. An empty set yields
/// an empty array. Nothing is released when a step fails.
///
/// # Errors
///
/// Returns [`Error::MarshalFailed`] if the element type can not be resolved, or if any
/// allocation or copy is rejected.
pub fn marshal<R: Runtime + ?Sized>(
    runtime: &R,
    env: ExecutionEnvironment,
    definitions: &ClassDefinitionSet<'_>,
) -> Result<Payload> {
    let element = runtime
        .find_class(env, BYTE_ARRAY_DESCRIPTOR)
        .ok_or_else(|| Error::MarshalFailed("byte[] element type not found".to_string()))?;

    let len = array_len(definitions.len())?;
    let array = runtime
        .new_object_array(env, len, element)
        .ok_or_else(|| Error::MarshalFailed(format!("can't allocate byte[{len}][]")))?;

    for (index, definition) in definitions.iter().enumerate() {
        let slot = array_len(index)?;
        let inner_len = array_len(definition.len())?;

        let inner = runtime.new_byte_array(env, inner_len).ok_or_else(|| {
            Error::MarshalFailed(format!("can't allocate byte[{inner_len}] for definition {index}"))
        })?;
        if !runtime.set_byte_array_region(env, inner, definition.bytes()) {
            return Err(Error::MarshalFailed(format!(
                "can't copy definition {index}"
            )));
        }
        if !runtime.set_object_array_element(env, array, slot, inner) {
            return Err(Error::MarshalFailed(format!(
                "can't store definition {index}"
            )));
        }
        trace!(index, len = definition.len(), "marshalled definition");
    }

    debug!(
        definitions = definitions.len(),
        bytes = definitions.total_bytes(),
        "payload marshalled"
    );
    Ok(Payload {
        array,
        len: definitions.len(),
    })
}

fn array_len(value: usize) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::MarshalFailed(format!("{value} exceeds the native array length")))
}
