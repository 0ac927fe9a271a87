use super::PlyError;

/// The vertex layout of a PLY file.
#[derive(Debug, PartialEq, Clone)]
pub enum PlyType {
    /// `float x y z` followed by `uchar red green blue`, the layout written by this crate.
    XYZRgb,
    /// Any other layout containing at least `x`, `y` and `z`.
    Dynamic(Vec<PlyPropertyDefinition>),
}

impl PlyType {
    /// Number of bytes of a binary vertex record.
    pub fn size_of(&self) -> usize {
        match self {
            PlyType::XYZRgb => 3 * 4 + 3,
            PlyType::Dynamic(props) => props.iter().map(|p| p.data_type.size()).sum(),
        }
    }

    /// Detect the vertex layout from the header properties.
    pub fn detect_format(properties: &[PlyPropertyDefinition]) -> Result<PlyType, PlyError> {
        use PlyDataType::{Float32, UInt8};

        let layout = properties
            .iter()
            .map(|p| (p.name.as_str(), p.data_type))
            .collect::<Vec<_>>();

        if layout
            == [
                ("x", Float32),
                ("y", Float32),
                ("z", Float32),
                ("red", UInt8),
                ("green", UInt8),
                ("blue", UInt8),
            ]
        {
            return Ok(PlyType::XYZRgb);
        }

        let has = |name: &str| properties.iter().any(|p| p.name == name);
        if !(has("x") && has("y") && has("z")) {
            return Err(PlyError::UnsupportedProperty);
        }

        Ok(PlyType::Dynamic(properties.to_vec()))
    }

    /// Whether the layout carries per vertex colors.
    pub fn has_color(&self) -> bool {
        match self {
            PlyType::XYZRgb => true,
            PlyType::Dynamic(props) => ["red", "green", "blue"]
                .iter()
                .all(|name| props.iter().any(|p| p.name == *name)),
        }
    }
}

/// A scalar vertex property declared in the header.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// The property name.
    pub name: String,
    /// The property scalar type.
    pub data_type: PlyDataType,
}

/// The scalar types of the PLY format.
#[derive(Debug, PartialEq, Clone, Copy)]
#[allow(missing_docs)]
pub enum PlyDataType {
    Float32,
    Float64,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
}

impl PlyDataType {
    /// Size in bytes of a binary value.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }
}

impl std::str::FromStr for PlyDataType {
    type Err = PlyError;

    /// Parse a header type name, in either the classic or the sized spelling.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let data_type = match name {
            "float" | "float32" => PlyDataType::Float32,
            "double" | "float64" => PlyDataType::Float64,
            "char" | "int8" => PlyDataType::Int8,
            "uchar" | "uint8" => PlyDataType::UInt8,
            "short" | "int16" => PlyDataType::Int16,
            "ushort" | "uint16" => PlyDataType::UInt16,
            "int" | "int32" => PlyDataType::Int32,
            "uint" | "uint32" => PlyDataType::UInt32,
            _ => return Err(PlyError::UnsupportedProperty),
        };
        Ok(data_type)
    }
}

/// Conversion of a decoded vertex into point cloud attributes.
pub trait PlyPropertyTrait {
    /// The vertex position.
    fn to_point(&self) -> [f64; 3];
    /// The vertex color, if the layout has one.
    fn to_color(&self) -> Option<[u8; 3]>;
}

/// A binary vertex of the [`PlyType::XYZRgb`] layout.
#[derive(Debug, bincode::Decode)]
pub struct XYZRgbProperty {
    /// The x coordinate.
    pub x: f32,
    /// The y coordinate.
    pub y: f32,
    /// The z coordinate.
    pub z: f32,
    /// The red channel.
    pub red: u8,
    /// The green channel.
    pub green: u8,
    /// The blue channel.
    pub blue: u8,
}

impl XYZRgbProperty {
    /// Decode a packed little endian record.
    pub fn decode(buffer: &[u8]) -> Result<Self, PlyError> {
        // legacy: little endian with fixed size integers, i.e. the packed PLY layout
        let (property, _) = bincode::decode_from_slice(buffer, bincode::config::legacy())?;
        Ok(property)
    }
}

impl PlyPropertyTrait for XYZRgbProperty {
    fn to_point(&self) -> [f64; 3] {
        [self.x as f64, self.y as f64, self.z as f64]
    }

    fn to_color(&self) -> Option<[u8; 3]> {
        Some([self.red, self.green, self.blue])
    }
}

/// Dynamic PLY property that can handle arbitrary schemas
#[derive(Debug)]
pub struct DynamicProperty {
    /// The decoded values, in header order.
    pub properties: Vec<(String, DynamicPropertyValue)>,
}

/// A decoded scalar value.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub enum DynamicPropertyValue {
    Float32(f32),
    Float64(f64),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
}

impl DynamicPropertyValue {
    fn as_f64(&self) -> f64 {
        match *self {
            DynamicPropertyValue::Float32(v) => v as f64,
            DynamicPropertyValue::Float64(v) => v,
            DynamicPropertyValue::Int8(v) => v as f64,
            DynamicPropertyValue::UInt8(v) => v as f64,
            DynamicPropertyValue::Int16(v) => v as f64,
            DynamicPropertyValue::UInt16(v) => v as f64,
            DynamicPropertyValue::Int32(v) => v as f64,
            DynamicPropertyValue::UInt32(v) => v as f64,
        }
    }
}

fn le_bytes<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N], PlyError> {
    buffer
        .get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(PlyError::UnsupportedProperty)
}

impl DynamicProperty {
    /// Decode a packed little endian record.
    pub fn parse_from_buffer(
        buffer: &[u8],
        schema: &[PlyPropertyDefinition],
    ) -> Result<Self, PlyError> {
        let mut properties = Vec::with_capacity(schema.len());
        let mut offset = 0;

        for prop_def in schema {
            let value = match prop_def.data_type {
                PlyDataType::Float32 => {
                    DynamicPropertyValue::Float32(f32::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Float64 => {
                    DynamicPropertyValue::Float64(f64::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Int8 => {
                    DynamicPropertyValue::Int8(i8::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::UInt8 => {
                    DynamicPropertyValue::UInt8(u8::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Int16 => {
                    DynamicPropertyValue::Int16(i16::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::UInt16 => {
                    DynamicPropertyValue::UInt16(u16::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Int32 => {
                    DynamicPropertyValue::Int32(i32::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::UInt32 => {
                    DynamicPropertyValue::UInt32(u32::from_le_bytes(le_bytes(buffer, offset)?))
                }
            };

            properties.push((prop_def.name.clone(), value));
            offset += prop_def.data_type.size();
        }

        Ok(DynamicProperty { properties })
    }

    /// Parse the whitespace separated tokens of an ascii record.
    pub fn parse_from_tokens(
        tokens: &[&str],
        schema: &[PlyPropertyDefinition],
    ) -> Result<Self, PlyError> {
        if tokens.len() != schema.len() {
            return Err(PlyError::UnsupportedProperty);
        }

        let properties = schema
            .iter()
            .zip(tokens)
            .map(|(prop_def, token)| {
                let value = match prop_def.data_type {
                    PlyDataType::Float32 => token.parse().map(DynamicPropertyValue::Float32).ok(),
                    PlyDataType::Float64 => token.parse().map(DynamicPropertyValue::Float64).ok(),
                    PlyDataType::Int8 => token.parse().map(DynamicPropertyValue::Int8).ok(),
                    PlyDataType::UInt8 => token.parse().map(DynamicPropertyValue::UInt8).ok(),
                    PlyDataType::Int16 => token.parse().map(DynamicPropertyValue::Int16).ok(),
                    PlyDataType::UInt16 => token.parse().map(DynamicPropertyValue::UInt16).ok(),
                    PlyDataType::Int32 => token.parse().map(DynamicPropertyValue::Int32).ok(),
                    PlyDataType::UInt32 => token.parse().map(DynamicPropertyValue::UInt32).ok(),
                };
                value
                    .map(|v| (prop_def.name.clone(), v))
                    .ok_or(PlyError::UnsupportedProperty)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DynamicProperty { properties })
    }

    fn get(&self, name: &str) -> Option<DynamicPropertyValue> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    fn get_float(&self, name: &str) -> f64 {
        self.get(name).map_or(0.0, |v| v.as_f64())
    }

    fn get_channel(&self, name: &str) -> Option<u8> {
        // float colors are stored in [0, 1]
        self.get(name).map(|v| match v {
            DynamicPropertyValue::Float32(_) | DynamicPropertyValue::Float64(_) => {
                (v.as_f64() * 255.0).round().clamp(0.0, 255.0) as u8
            }
            _ => v.as_f64().clamp(0.0, 255.0) as u8,
        })
    }
}

impl PlyPropertyTrait for DynamicProperty {
    fn to_point(&self) -> [f64; 3] {
        [self.get_float("x"), self.get_float("y"), self.get_float("z")]
    }

    fn to_color(&self) -> Option<[u8; 3]> {
        Some([
            self.get_channel("red")?,
            self.get_channel("green")?,
            self.get_channel("blue")?,
        ])
    }
}
