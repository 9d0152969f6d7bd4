//! Case configuration: the uploaded image plus the chosen case options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Implements `as_str`/`FromStr`/`Display` for a string-backed option enum.
macro_rules! case_option {
    ($name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self { $($name::$variant => $value),+ }
            }
        }

        impl FromStr for $name {
            type Err = ConfigurationError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(ConfigurationError::UnknownOption { kind: stringify!($name), value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneModel {
    #[serde(rename = "iPhone 14 Pro")] IPhone14Pro,
    #[serde(rename = "iPhone 14 Pro Max")] IPhone14ProMax,
    #[serde(rename = "iPhone 14")] IPhone14,
    #[serde(rename = "iPhone 14 Plus")] IPhone14Plus,
}

case_option!(PhoneModel {
    IPhone14Pro => "iPhone 14 Pro",
    IPhone14ProMax => "iPhone 14 Pro Max",
    IPhone14 => "iPhone 14",
    IPhone14Plus => "iPhone 14 Plus",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseColor { Black, Blue, Rose, Pink, Green, Yellow }

case_option!(CaseColor {
    Black => "black",
    Blue => "blue",
    Rose => "rose",
    Pink => "pink",
    Green => "green",
    Yellow => "yellow",
});

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMaterial { #[default] Silicone, Polycarbonate }

case_option!(CaseMaterial { Silicone => "silicone", Polycarbonate => "polycarbonate" });

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseFinish { #[default] Smooth, Textured }

case_option!(CaseFinish { Smooth => "smooth", Textured => "textured" });

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: Uuid,
    pub image_url: String,
    pub width: i32,
    pub height: i32,
    pub cropped_image_url: Option<String>,
    pub model: Option<PhoneModel>,
    pub color: Option<CaseColor>,
    pub material: Option<CaseMaterial>,
    pub finish: Option<CaseFinish>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Choices made on the design step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Design {
    pub model: PhoneModel,
    pub color: CaseColor,
    pub material: CaseMaterial,
    pub finish: CaseFinish,
    pub cropped_image_url: String,
}

impl Configuration {
    pub fn upload(image_url: impl Into<String>, width: i32, height: i32) -> Result<Self, ConfigurationError> {
        let image_url = image_url.into();
        if image_url.trim().is_empty() { return Err(ConfigurationError::MissingImage); }
        if width <= 0 || height <= 0 { return Err(ConfigurationError::InvalidDimensions { width, height }); }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(), image_url, width, height, cropped_image_url: None,
            model: None, color: None, material: None, finish: None, created_at: now, updated_at: now,
        })
    }

    pub fn apply_design(&mut self, design: Design) -> Result<(), ConfigurationError> {
        if design.cropped_image_url.trim().is_empty() { return Err(ConfigurationError::MissingImage); }
        self.model = Some(design.model);
        self.color = Some(design.color);
        self.material = Some(design.material);
        self.finish = Some(design.finish);
        self.cropped_image_url = Some(design.cropped_image_url);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn material(&self) -> CaseMaterial { self.material.unwrap_or_default() }
    pub fn finish(&self) -> CaseFinish { self.finish.unwrap_or_default() }

    /// A configuration can be checked out once the design step is done.
    pub fn is_complete(&self) -> bool {
        self.cropped_image_url.is_some() && self.model.is_some() && self.color.is_some()
    }

    /// Image shown for the case: the cropped design when present.
    pub fn display_image(&self) -> &str {
        self.cropped_image_url.as_deref().unwrap_or(&self.image_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("An image is required")]
    MissingImage,
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("Unknown {kind} option: {value}")]
    UnknownOption { kind: &'static str, value: String },
    #[error("Configuration is incomplete")]
    Incomplete,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design() -> Design {
        Design {
            model: PhoneModel::IPhone14Pro, color: CaseColor::Rose, material: CaseMaterial::Polycarbonate,
            finish: CaseFinish::Textured, cropped_image_url: "https://img.example/cropped.png".into(),
        }
    }

    #[test]
    fn test_upload_rejects_bad_dimensions() {
        assert_eq!(Configuration::upload("https://img.example/a.png", 0, 10), Err(ConfigurationError::InvalidDimensions { width: 0, height: 10 }));
        assert_eq!(Configuration::upload(" ", 10, 10), Err(ConfigurationError::MissingImage));
    }

    #[test]
    fn test_design_completes_configuration() {
        let mut config = Configuration::upload("https://img.example/a.png", 800, 600).unwrap();
        assert!(!config.is_complete());
        assert_eq!(config.material(), CaseMaterial::Silicone);
        assert_eq!(config.display_image(), "https://img.example/a.png");
        config.apply_design(design()).unwrap();
        assert!(config.is_complete());
        assert_eq!(config.finish(), CaseFinish::Textured);
        assert_eq!(config.display_image(), "https://img.example/cropped.png");
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("iPhone 14 Pro Max".parse::<PhoneModel>().unwrap(), PhoneModel::IPhone14ProMax);
        assert_eq!(CaseColor::ALL.len(), 6);
        assert!("leather".parse::<CaseMaterial>().is_err());
        assert_eq!(serde_json::to_string(&PhoneModel::IPhone14Plus).unwrap(), "\"iPhone 14 Plus\"");
    }
}
