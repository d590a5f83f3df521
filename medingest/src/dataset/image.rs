//! Volumetric grid datasets and typed scalar arrays.

use std::fmt;
use std::str::FromStr;

use bytes::Buf;
use serde::{Deserialize, Serialize};

/// Numeric element type of a scalar array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            ElementType::Int8 | ElementType::Uint8 => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Int32 | ElementType::Uint32 | ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }

    /// Canonical lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::Uint8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::Uint16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::Uint32 => "uint32",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int8" | "i8" => Ok(ElementType::Int8),
            "uint8" | "u8" => Ok(ElementType::Uint8),
            "int16" | "i16" => Ok(ElementType::Int16),
            "uint16" | "u16" => Ok(ElementType::Uint16),
            "int32" | "i32" => Ok(ElementType::Int32),
            "uint32" | "u32" => Ok(ElementType::Uint32),
            "float32" | "f32" => Ok(ElementType::Float32),
            "float64" | "f64" => Ok(ElementType::Float64),
            other => Err(format!("unknown element type '{}'", other)),
        }
    }
}

/// Typed scalar values.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValues {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ScalarValues {
    /// Interpret a little-endian byte buffer as an array of `element_type`.
    ///
    /// Fails if the buffer length is not a multiple of the element size.
    pub fn from_le_bytes(element_type: ElementType, data: &[u8]) -> Result<Self, String> {
        let size = element_type.size();
        if data.len() % size != 0 {
            return Err(format!(
                "buffer of {} bytes is not a whole number of {} elements",
                data.len(),
                element_type
            ));
        }

        let count = data.len() / size;
        let mut buf = data;
        let values = match element_type {
            ElementType::Int8 => ScalarValues::Int8((0..count).map(|_| buf.get_i8()).collect()),
            ElementType::Uint8 => ScalarValues::Uint8(data.to_vec()),
            ElementType::Int16 => {
                ScalarValues::Int16((0..count).map(|_| buf.get_i16_le()).collect())
            }
            ElementType::Uint16 => {
                ScalarValues::Uint16((0..count).map(|_| buf.get_u16_le()).collect())
            }
            ElementType::Int32 => {
                ScalarValues::Int32((0..count).map(|_| buf.get_i32_le()).collect())
            }
            ElementType::Uint32 => {
                ScalarValues::Uint32((0..count).map(|_| buf.get_u32_le()).collect())
            }
            ElementType::Float32 => {
                ScalarValues::Float32((0..count).map(|_| buf.get_f32_le()).collect())
            }
            ElementType::Float64 => {
                ScalarValues::Float64((0..count).map(|_| buf.get_f64_le()).collect())
            }
        };

        Ok(values)
    }

    /// Number of scalar values.
    pub fn len(&self) -> usize {
        match self {
            ScalarValues::Int8(v) => v.len(),
            ScalarValues::Uint8(v) => v.len(),
            ScalarValues::Int16(v) => v.len(),
            ScalarValues::Uint16(v) => v.len(),
            ScalarValues::Int32(v) => v.len(),
            ScalarValues::Uint32(v) => v.len(),
            ScalarValues::Float32(v) => v.len(),
            ScalarValues::Float64(v) => v.len(),
        }
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the values.
    pub fn element_type(&self) -> ElementType {
        match self {
            ScalarValues::Int8(_) => ElementType::Int8,
            ScalarValues::Uint8(_) => ElementType::Uint8,
            ScalarValues::Int16(_) => ElementType::Int16,
            ScalarValues::Uint16(_) => ElementType::Uint16,
            ScalarValues::Int32(_) => ElementType::Int32,
            ScalarValues::Uint32(_) => ElementType::Uint32,
            ScalarValues::Float32(_) => ElementType::Float32,
            ScalarValues::Float64(_) => ElementType::Float64,
        }
    }
}

/// A named array of scalar tuples attached to the points of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    /// Array name (e.g. `"Scalars"`).
    pub name: String,
    /// Components per tuple (1 for grey values, 4 for RGBA).
    pub components: usize,
    /// Flat values, `components` per point.
    pub values: ScalarValues,
}

impl DataArray {
    /// Create a new data array.
    pub fn new(name: impl Into<String>, components: usize, values: ScalarValues) -> Self {
        Self {
            name: name.into(),
            components: components.max(1),
            values,
        }
    }

    /// Number of tuples (points covered by this array).
    pub fn tuple_count(&self) -> usize {
        self.values.len() / self.components
    }
}

/// A regular volumetric grid with point scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Index extent `[x0, x1, y0, y1, z0, z1]`, inclusive.
    pub extent: [usize; 6],
    /// Distance between grid points along each axis.
    pub spacing: [f64; 3],
    /// World position of the first grid point.
    pub origin: [f64; 3],
    /// Point scalars.
    pub scalars: DataArray,
}

impl ImageData {
    /// Create a grid with extent `[0, x-1] × [0, y-1] × [0, z-1]`.
    ///
    /// Every dimension must be at least 1.
    pub fn with_dimensions(dimensions: [usize; 3], spacing: [f64; 3], scalars: DataArray) -> Self {
        Self {
            extent: [
                0,
                dimensions[0].saturating_sub(1),
                0,
                dimensions[1].saturating_sub(1),
                0,
                dimensions[2].saturating_sub(1),
            ],
            spacing,
            origin: [0.0; 3],
            scalars,
        }
    }

    /// Number of points along each axis.
    pub fn dimensions(&self) -> [usize; 3] {
        [
            self.extent[1] - self.extent[0] + 1,
            self.extent[3] - self.extent[2] + 1,
            self.extent[5] - self.extent[4] + 1,
        ]
    }

    /// Total number of grid points.
    pub fn point_count(&self) -> usize {
        self.dimensions().iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_parse() {
        assert_eq!("uint8".parse::<ElementType>(), Ok(ElementType::Uint8));
        assert_eq!("Float32".parse::<ElementType>(), Ok(ElementType::Float32));
        assert!("complex".parse::<ElementType>().is_err());
    }

    #[test]
    fn test_element_type_serde_name() {
        let json = serde_json::to_string(&ElementType::Uint16).unwrap();
        assert_eq!(json, "\"uint16\"");
    }

    #[test]
    fn test_scalars_uint16_little_endian() {
        let values = ScalarValues::from_le_bytes(ElementType::Uint16, &[0x01, 0x00, 0x00, 0x01])
            .unwrap();
        assert_eq!(values, ScalarValues::Uint16(vec![1, 256]));
    }

    #[test]
    fn test_scalars_float32() {
        let bytes = 1.5f32.to_le_bytes();
        let values = ScalarValues::from_le_bytes(ElementType::Float32, &bytes).unwrap();
        assert_eq!(values, ScalarValues::Float32(vec![1.5]));
    }

    #[test]
    fn test_scalars_partial_element_rejected() {
        let result = ScalarValues::from_le_bytes(ElementType::Int32, &[0, 0, 0, 0, 0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_image_dimensions() {
        let scalars = DataArray::new("Scalars", 1, ScalarValues::Uint8(vec![0; 24]));
        let image = ImageData::with_dimensions([2, 3, 4], [1.0, 1.0, 2.5], scalars);

        assert_eq!(image.extent, [0, 1, 0, 2, 0, 3]);
        assert_eq!(image.dimensions(), [2, 3, 4]);
        assert_eq!(image.point_count(), 24);
        assert_eq!(image.scalars.tuple_count(), 24);
    }
}
