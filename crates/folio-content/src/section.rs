//! Known top-level sections of the portfolio content tree

use std::fmt;
use std::str::FromStr;

/// Top-level section keys.
///
/// The tree is guided by this set but never restricted to it: missing or
/// extra keys are tolerated everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    PersonalInfo,
    SocialLinks,
    Navigation,
    Hero,
    About,
    Skills,
    Projects,
    Experience,
    Certifications,
    Contact,
}

impl Section {
    /// Every known section, in display order
    pub const ALL: [Section; 10] = [
        Section::PersonalInfo,
        Section::SocialLinks,
        Section::Navigation,
        Section::Hero,
        Section::About,
        Section::Skills,
        Section::Projects,
        Section::Experience,
        Section::Certifications,
        Section::Contact,
    ];

    /// Key used in the content tree
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::PersonalInfo => "personalInfo",
            Section::SocialLinks => "socialLinks",
            Section::Navigation => "navigation",
            Section::Hero => "hero",
            Section::About => "about",
            Section::Skills => "skills",
            Section::Projects => "projects",
            Section::Experience => "experience",
            Section::Certifications => "certifications",
            Section::Contact => "contact",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}

/// A key that is not one of the known sections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section '{0}'")]
pub struct UnknownSection(pub String);
