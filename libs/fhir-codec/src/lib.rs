//! Registry-driven FHIR STU3 JSON codec.
//!
//! Decoding walks a JSON resource under the type descriptors of an
//! [`osler_registry::TypeRegistry`] and produces a [`ResourceInstance`]:
//! typed primitives with their `_field` companions merged, `[x]` choice
//! groups resolved to a single [`ChoiceSlot`], unresolved references, and
//! inline resources dispatched by their own `resourceType`. Anything the
//! descriptors don't cover is preserved raw, so encoding the instance back
//! yields a document semantically equal to the input.
//!
//! Only structurally fatal conditions (malformed JSON, a non-object root,
//! a missing or unknown top-level `resourceType`) surface as [`CodecError`];
//! data-level problems are accumulated as [`Diagnostic`]s on the instance.
//!
//! ```no_run
//! use osler_codec::Codec;
//! use osler_registry::stu3;
//!
//! # fn main() -> osler_codec::Result<()> {
//! let codec = Codec::new(stu3::core_registry());
//! let instance = codec.decode_str(r#"{"resourceType":"Patient","active":true}"#)?;
//! assert_eq!(instance.body.primitive_bool("active"), Some(true));
//! let json = codec.encode_string(&instance)?;
//! # let _ = json;
//! # Ok(())
//! # }
//! ```

pub mod choice;
pub mod decode;
pub mod diagnostics;
pub mod encode;
pub mod error;
pub mod instance;
mod lexical;
pub mod path;

pub use choice::{ChoiceConflict, ChoiceSlot};
pub use decode::Codec;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use encode::encode_resource;
pub use error::{CodecError, Result};
pub use instance::{
    ComplexValue, DecodedResource, ElementMeta, FieldValue, Primitive, ReferenceValue,
    ResourceInstance,
};
pub use path::JsonPath;
