/// A country and the administrative regions attached to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Country {
    /// Short identifier, e.g. "FR"
    pub code: String,

    /// Display name, apostrophes already normalized
    pub name: String,

    /// Regions in page order; empty until a region batch is attached
    pub regions: Vec<Region>,
}

impl Country {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            regions: Vec::new(),
        }
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = regions;
        self
    }
}

/// An administrative subdivision of a country
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    /// Identifier, unique only within its country
    pub id: String,

    pub name: String,
}

impl Region {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
