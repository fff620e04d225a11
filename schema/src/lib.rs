//! Runtime support for the Bebop wire format: byte buffers, a runtime type
//! descriptor, and a dynamic [Value] codec that follows exactly the same
//! rules as generated code.
//!
//! ```
//! use brine_bebop_schema::*;
//!
//! let schema = Schema::new(vec![
//!     Def::new("Point".to_owned(), DefKind::Struct, vec![
//!         Field { name: "x".to_owned(), type_: Type::Float32, value: 0 },
//!         Field { name: "y".to_owned(), type_: Type::Float32, value: 0 },
//!     ]),
//! ]);
//!
//! let point = schema.type_of("Point").unwrap();
//! let value = Value::decode(&schema, &point, &[0, 0, 0, 63, 0, 0, 0, 191]).unwrap();
//! assert_eq!(format!("{:?}", value), "Point {x: 0.5, y: -0.5}");
//! assert_eq!(value.encode(&schema, &point).unwrap(), [0, 0, 0, 63, 0, 0, 0, 191]);
//! ```

pub mod bb;
pub mod error;
pub mod record;
pub mod schema;
pub mod value;

pub use bb::*;
pub use error::*;
pub use record::*;
pub use schema::*;
pub use value::*;

pub use uuid::Uuid;
