//! Addon descriptors and the store that reads and writes them

pub mod addon_config;
pub mod ini;
pub mod store;

pub use addon_config::{AddonConfig, ConfigItem};
pub use ini::{IniDocument, IniValue};
pub use store::DescriptorStore;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use ini::IniSection;

/// Descriptor file of a plain module package
pub const MODULE_DESCRIPTOR: &str = "module.ini";
/// Descriptor file of an application package
pub const APP_DESCRIPTOR: &str = "app.ini";

/// Whether an addon participates in routing and hook dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonState {
    #[default]
    Disabled,
    Enabled,
}

impl AddonState {
    pub fn is_enabled(self) -> bool {
        self == AddonState::Enabled
    }

    fn as_ini(self) -> IniValue {
        match self {
            AddonState::Disabled => IniValue::Int(0),
            AddonState::Enabled => IniValue::Int(1),
        }
    }
}

/// Package kind, told apart by which descriptor file is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Module,
    App,
}

impl PackageKind {
    pub fn descriptor_file(self) -> &'static str {
        match self {
            PackageKind::Module => MODULE_DESCRIPTOR,
            PackageKind::App => APP_DESCRIPTOR,
        }
    }
}

/// Persisted metadata record of one installed addon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddonDescriptor {
    pub name: String,
    pub title: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub state: AddonState,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub rewrite: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub kind: PackageKind,
    /// Top-level keys this crate does not interpret, kept for round-trips
    #[serde(skip)]
    pub extra: IniSection,
    #[serde(skip)]
    pub extra_sections: IndexMap<String, IniSection>,
}

impl AddonDescriptor {
    pub fn new(name: impl Into<String>, kind: PackageKind) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            version: String::new(),
            author: String::new(),
            description: String::new(),
            state: AddonState::Disabled,
            rewrite: IndexMap::new(),
            domain: None,
            kind,
            extra: IniSection::new(),
            extra_sections: IndexMap::new(),
        }
    }

    pub fn from_ini(mut doc: IniDocument, kind: PackageKind) -> Result<Self> {
        let mut take = |key: &str| -> String {
            doc.root
                .shift_remove(key)
                .map(|v| v.to_string())
                .unwrap_or_default()
        };

        let name = take("name");
        if name.is_empty() {
            return Err(Error::Descriptor("descriptor has no name".to_string()));
        }
        let title = take("title");
        let version = take("version");
        let author = take("author");
        let description = take("description");
        let domain = Some(take("domain")).filter(|d| !d.is_empty());
        let state = match doc.root.shift_remove("state") {
            Some(v) if v.as_flag() => AddonState::Enabled,
            _ => AddonState::Disabled,
        };

        let rewrite = doc
            .sections
            .shift_remove("rewrite")
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();

        Ok(Self {
            name,
            title,
            version,
            author,
            description,
            state,
            rewrite,
            domain,
            kind,
            extra: doc.root,
            extra_sections: doc.sections,
        })
    }

    pub fn to_ini(&self) -> IniDocument {
        let mut root = IniSection::new();
        root.insert("name".to_string(), self.name.as_str().into());
        root.insert("title".to_string(), self.title.as_str().into());
        if !self.description.is_empty() {
            root.insert("description".to_string(), self.description.as_str().into());
        }
        if !self.author.is_empty() {
            root.insert("author".to_string(), self.author.as_str().into());
        }
        root.insert("version".to_string(), self.version.as_str().into());
        root.insert("state".to_string(), self.state.as_ini());
        if let Some(domain) = &self.domain {
            root.insert("domain".to_string(), domain.as_str().into());
        }
        for (key, value) in &self.extra {
            root.insert(key.clone(), value.clone());
        }

        let mut sections = self.extra_sections.clone();
        if !self.rewrite.is_empty() {
            sections.insert(
                "rewrite".to_string(),
                self.rewrite
                    .iter()
                    .map(|(k, v)| (k.clone(), v.as_str().into()))
                    .collect(),
            );
        }

        IniDocument { root, sections }
    }

    /// A descriptor is usable once it names, titles and versions the package
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.title.is_empty() && !self.version.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG_INI: &str = "\
name = blog
title = Blog
author = jane
version = 1.2.0
state = 1
website = https://example.com
[rewrite]
post/view = article/[id]
";

    #[test]
    fn test_descriptor_from_ini() {
        let doc = IniDocument::parse(BLOG_INI).unwrap();
        let descriptor = AddonDescriptor::from_ini(doc, PackageKind::Module).unwrap();

        assert_eq!(descriptor.name, "blog");
        assert_eq!(descriptor.state, AddonState::Enabled);
        assert_eq!(descriptor.rewrite["post/view"], "article/[id]");
        assert_eq!(descriptor.domain, None);
        assert_eq!(
            descriptor.extra["website"].as_str(),
            Some("https://example.com")
        );
        assert!(descriptor.is_complete());
    }

    #[test]
    fn test_descriptor_round_trips_unknown_keys() {
        let doc = IniDocument::parse(BLOG_INI).unwrap();
        let mut descriptor = AddonDescriptor::from_ini(doc, PackageKind::Module).unwrap();
        descriptor.state = AddonState::Disabled;

        let reparsed =
            AddonDescriptor::from_ini(descriptor.to_ini(), PackageKind::Module).unwrap();
        assert_eq!(reparsed, descriptor);
        assert_eq!(reparsed.state, AddonState::Disabled);
    }

    #[test]
    fn test_descriptor_without_name_is_rejected() {
        let doc = IniDocument::parse("title = Nameless\n").unwrap();
        assert!(matches!(
            AddonDescriptor::from_ini(doc, PackageKind::App),
            Err(Error::Descriptor(_))
        ));
    }
}
