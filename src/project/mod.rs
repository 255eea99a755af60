//! Resource registry - decoded project resources keyed by ID and name
//!
//! The page manager reads page and subpage definitions from a
//! [`ResourceRegistry`] and consults its address maps to resolve protocol
//! addresses into buttons. [`ProjectResources`] is the in-memory registry
//! loaded from a project file.

mod model;

pub use model::{ButtonDef, CollapsibleDef, PageDef, ProjectDef, SubPageDef, SubViewDef};

use crate::panel::{SurfaceKind, REGULAR_SUBPAGE_START, SYSTEM_PAGE_START, SYSTEM_SUBPAGE_START};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Where a mapped button lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonLocation {
    /// Page or subpage ID
    pub parent_id: u16,
    /// Button index on that page or subpage
    pub index: u16,
}

/// Errors while loading or indexing a project
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read project file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("duplicate ID {0} in project")]
    DuplicateId(u16),

    #[error("{kind} '{name}' has ID {id} outside its range")]
    IdOutOfRange { kind: &'static str, name: String, id: u16 },

    #[error("duplicate button index {index} on '{parent}'")]
    DuplicateButton { parent: String, index: u16 },
}

/// Read-only access to project resources
pub trait ResourceRegistry: Send + Sync {
    fn page(&self, id: u16) -> Option<&PageDef>;
    fn page_by_name(&self, name: &str) -> Option<&PageDef>;
    fn subpage(&self, id: u16) -> Option<&SubPageDef>;
    fn subpage_by_name(&self, name: &str) -> Option<&SubPageDef>;

    /// Buttons whose push/feedback channel is (port, channel)
    fn channel_targets(&self, port: u16, channel: u16) -> &[ButtonLocation];
    /// Buttons whose variable text address is (port, code)
    fn address_targets(&self, port: u16, code: u16) -> &[ButtonLocation];
    /// Buttons whose level (or joystick Y level) is (port, channel)
    fn level_targets(&self, port: u16, channel: u16) -> &[ButtonLocation];

    fn power_up_page(&self) -> Option<&str>;
    fn power_up_popups(&self) -> &[String];
    fn page_names(&self) -> Vec<String>;
}

type AddressMap = HashMap<(u16, u16), Vec<ButtonLocation>>;

/// In-memory registry built from a [`ProjectDef`]
#[derive(Debug, Default)]
pub struct ProjectResources {
    project: ProjectDef,
    pages_by_id: HashMap<u16, usize>,
    subpages_by_id: HashMap<u16, usize>,
    channel_map: AddressMap,
    address_map: AddressMap,
    level_map: AddressMap,
}

impl ProjectResources {
    /// Index a project definition
    pub fn new(project: ProjectDef) -> Result<Self, ProjectError> {
        let mut resources = Self {
            project,
            ..Self::default()
        };
        resources.index()?;
        Ok(resources)
    }

    /// Load a YAML (`.yaml`, `.yml`) or JSON project file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: shown.clone(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let project: ProjectDef = if is_json {
            serde_json::from_str(&contents).map_err(|e| ProjectError::Parse {
                path: shown.clone(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ProjectError::Parse {
                path: shown.clone(),
                reason: e.to_string(),
            })?
        };

        let resources = Self::new(project)?;
        info!(
            "Loaded project '{}' from {} ({} pages, {} subpages)",
            resources.project.name,
            shown,
            resources.project.pages.len(),
            resources.project.subpages.len()
        );
        Ok(resources)
    }

    pub fn project(&self) -> &ProjectDef {
        &self.project
    }

    fn index(&mut self) -> Result<(), ProjectError> {
        let mut seen = HashSet::new();

        for (position, page) in self.project.pages.iter().enumerate() {
            if SurfaceKind::of(page.id) != SurfaceKind::Page || page.id == 0 {
                return Err(ProjectError::IdOutOfRange {
                    kind: "page",
                    name: page.name.clone(),
                    id: page.id,
                });
            }
            if !seen.insert(page.id) {
                return Err(ProjectError::DuplicateId(page.id));
            }
            self.pages_by_id.insert(page.id, position);
            Self::index_buttons(
                page.id,
                &page.name,
                &page.buttons,
                &mut self.channel_map,
                &mut self.address_map,
                &mut self.level_map,
            )?;
        }

        for (position, subpage) in self.project.subpages.iter().enumerate() {
            let in_range = (REGULAR_SUBPAGE_START..SYSTEM_PAGE_START).contains(&subpage.id)
                || subpage.id >= SYSTEM_SUBPAGE_START;
            if !in_range {
                return Err(ProjectError::IdOutOfRange {
                    kind: "subpage",
                    name: subpage.name.clone(),
                    id: subpage.id,
                });
            }
            if !seen.insert(subpage.id) {
                return Err(ProjectError::DuplicateId(subpage.id));
            }
            self.subpages_by_id.insert(subpage.id, position);
            Self::index_buttons(
                subpage.id,
                &subpage.name,
                &subpage.buttons,
                &mut self.channel_map,
                &mut self.address_map,
                &mut self.level_map,
            )?;
        }

        debug!(
            "Indexed {} channel, {} address and {} level entries",
            self.channel_map.len(),
            self.address_map.len(),
            self.level_map.len()
        );
        Ok(())
    }

    fn index_buttons(
        parent_id: u16,
        parent_name: &str,
        buttons: &[ButtonDef],
        channel_map: &mut AddressMap,
        address_map: &mut AddressMap,
        level_map: &mut AddressMap,
    ) -> Result<(), ProjectError> {
        let mut indexes = HashSet::new();
        for button in buttons {
            if button.index == 0 || !indexes.insert(button.index) {
                return Err(ProjectError::DuplicateButton {
                    parent: parent_name.to_string(),
                    index: button.index,
                });
            }
            let location = ButtonLocation {
                parent_id,
                index: button.index,
            };
            if let Some(channel) = button.channel.filter(|c| c.code > 0) {
                channel_map
                    .entry((channel.port, channel.code))
                    .or_default()
                    .push(location);
            }
            if let Some(address) = button.address.filter(|a| a.code > 0) {
                address_map
                    .entry((address.port, address.code))
                    .or_default()
                    .push(location);
            }
            for level in [button.level, button.level_y].into_iter().flatten() {
                if level.code > 0 {
                    level_map
                        .entry((level.port, level.code))
                        .or_default()
                        .push(location);
                }
            }
        }
        Ok(())
    }
}

impl ResourceRegistry for ProjectResources {
    fn page(&self, id: u16) -> Option<&PageDef> {
        self.pages_by_id.get(&id).map(|i| &self.project.pages[*i])
    }

    fn page_by_name(&self, name: &str) -> Option<&PageDef> {
        self.project.pages.iter().find(|p| p.name == name)
    }

    fn subpage(&self, id: u16) -> Option<&SubPageDef> {
        self.subpages_by_id.get(&id).map(|i| &self.project.subpages[*i])
    }

    fn subpage_by_name(&self, name: &str) -> Option<&SubPageDef> {
        self.project.subpages.iter().find(|p| p.name == name)
    }

    fn channel_targets(&self, port: u16, channel: u16) -> &[ButtonLocation] {
        self.channel_map
            .get(&(port, channel))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn address_targets(&self, port: u16, code: u16) -> &[ButtonLocation] {
        self.address_map
            .get(&(port, code))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn level_targets(&self, port: u16, channel: u16) -> &[ButtonLocation] {
        self.level_map
            .get(&(port, channel))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn power_up_page(&self) -> Option<&str> {
        self.project
            .power_up_page
            .as_deref()
            .or_else(|| self.project.pages.first().map(|p| p.name.as_str()))
    }

    fn power_up_popups(&self) -> &[String] {
        &self.project.power_up_popups
    }

    fn page_names(&self) -> Vec<String> {
        self.project.pages.iter().map(|p| p.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Address;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROJECT: &str = r#"
name: Demo
power_up_page: Main
pages:
  - id: 1
    name: Main
    buttons:
      - index: 1
        name: Power
        left: 10
        top: 10
        width: 100
        height: 50
        channel: { port: 1, code: 10 }
        address: { port: 1, code: 10 }
  - id: 2
    name: Audio
    buttons:
      - index: 1
        type: bargraph
        level: { port: 1, code: 7 }
        range: { low: 0, high: 100, invert: true }
subpages:
  - id: 500
    name: Volume
    group: dialogs
    left: 100
    top: 100
    width: 300
    height: 200
    buttons:
      - index: 4
        channel: { port: 1, code: 10 }
"#;

    #[test]
    fn test_load_yaml_project() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(PROJECT.as_bytes()).unwrap();

        let resources = ProjectResources::load(file.path()).unwrap();
        assert_eq!(resources.power_up_page(), Some("Main"));
        assert_eq!(resources.page(2).unwrap().name, "Audio");
        assert_eq!(resources.subpage_by_name("Volume").unwrap().rect.width, 300);
        assert_eq!(resources.channel_targets(1, 10).len(), 2);
        assert_eq!(resources.address_targets(1, 10).len(), 1);
        assert_eq!(
            resources.level_targets(1, 7),
            &[ButtonLocation { parent_id: 2, index: 1 }]
        );
        assert!(resources.channel_targets(2, 10).is_empty());
    }

    #[test]
    fn test_rejects_duplicates_and_ranges() {
        let page = PageDef {
            id: 1,
            name: "A".into(),
            ..PageDef::default()
        };
        let dup = ProjectDef {
            pages: vec![page.clone(), page.clone()],
            ..ProjectDef::default()
        };
        assert!(matches!(
            ProjectResources::new(dup),
            Err(ProjectError::DuplicateId(1))
        ));

        let wrong = ProjectDef {
            subpages: vec![SubPageDef {
                id: 10,
                name: "Popup".into(),
                ..SubPageDef::default()
            }],
            ..ProjectDef::default()
        };
        assert!(matches!(
            ProjectResources::new(wrong),
            Err(ProjectError::IdOutOfRange { .. })
        ));

        let buttons = ProjectDef {
            pages: vec![PageDef {
                buttons: vec![
                    ButtonDef { index: 1, channel: Some(Address::new(1, 1)), ..ButtonDef::default() },
                    ButtonDef { index: 1, ..ButtonDef::default() },
                ],
                ..page
            }],
            ..ProjectDef::default()
        };
        assert!(matches!(
            ProjectResources::new(buttons),
            Err(ProjectError::DuplicateButton { .. })
        ));
    }

    #[test]
    fn test_load_demo_project() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/project.yaml");
        let resources = ProjectResources::load(path).unwrap();
        assert_eq!(resources.power_up_page(), Some("Main"));
        assert_eq!(resources.channel_targets(1, 10).len(), 1);
        assert_eq!(resources.level_targets(1, 1).len(), 1);
        assert!(resources.subpage_by_name("Sources").is_some());
    }
}
