//! The fixed preset catalogue named in a `/img/<preset>/plain/<did>/<cid>`
//! request path.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Crop to exactly fill the target dimensions.
    Cover,
    /// Fit within the target dimensions without upscaling past them.
    Contain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub fit: Fit,
}

pub const AVATAR: Preset = Preset {
    name: "avatar",
    width: 1000,
    height: 1000,
    fit: Fit::Cover,
};

pub const AVATAR_SMALL: Preset = Preset {
    name: "avatar_small",
    width: 360,
    height: 360,
    fit: Fit::Cover,
};

pub const BANNER: Preset = Preset {
    name: "banner",
    width: 640,
    height: 300,
    fit: Fit::Cover,
};

pub const EMBED_THUMBNAIL: Preset = Preset {
    name: "embed_thumbnail",
    width: 720,
    height: 360,
    fit: Fit::Cover,
};

pub const CONTENT_PREVIEW: Preset = Preset {
    name: "content_preview",
    width: 800,
    height: 800,
    fit: Fit::Contain,
};

const CATALOGUE: &[Preset] = &[AVATAR, AVATAR_SMALL, BANNER, EMBED_THUMBNAIL, CONTENT_PREVIEW];

pub fn lookup(name: &str) -> Option<Preset> {
    CATALOGUE.iter().find(|p| p.name == name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalogue_entry_resolves_by_its_own_name() {
        for preset in CATALOGUE {
            assert_eq!(lookup(preset.name), Some(*preset));
        }
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert_eq!(lookup("thumbnail_9000"), None);
    }
}
