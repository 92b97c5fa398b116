//! Per-version class layout.

use crate::element::StreamerElement;

/// Schema version reserved for classes read by a registered custom streamer
pub const CUSTOM_STREAMER_VERSION: i32 = -1;

/// Member layout of one version of a class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSchema {
    /// Class name
    pub class_name: String,
    /// Class version this layout belongs to
    pub version: i32,
    /// Layout checksum written by the producer (0 if unknown)
    pub checksum: u32,
    /// Members in stream order, base classes first
    pub elements: Vec<StreamerElement>,
}

impl ClassSchema {
    /// Create an empty layout
    pub fn new(class_name: impl Into<String>, version: i32) -> Self {
        ClassSchema {
            class_name: class_name.into(),
            version,
            checksum: 0,
            elements: Vec::new(),
        }
    }

    /// Marker schema for a class with a custom streamer
    pub fn custom(class_name: impl Into<String>) -> Self {
        Self::new(class_name, CUSTOM_STREAMER_VERSION)
    }

    /// Set the checksum
    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = checksum;
        self
    }

    /// Append a member
    pub fn with_element(mut self, element: StreamerElement) -> Self {
        self.elements.push(element);
        self
    }

    /// True for the custom-streamer marker
    pub fn is_custom(&self) -> bool {
        self.version == CUSTOM_STREAMER_VERSION && self.elements.is_empty()
    }

    /// Names of direct base classes, in stream order
    pub fn base_classes(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.is_base())
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Element by member name
    pub fn element(&self, name: &str) -> Option<&StreamerElement> {
        self.elements.iter().find(|e| e.name == name)
    }
}
