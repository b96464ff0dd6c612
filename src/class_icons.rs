//! Player classes and their icon files

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;

use crate::constants::resources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerClass {
    Warrior,
    Lancer,
    Slayer,
    Berserker,
    Sorcerer,
    Archer,
    Priest,
    Mystic,
    Reaper,
    Gunner,
    Brawler,
    Ninja,
    Valkyrie,
    Common,
}

impl PlayerClass {
    pub const COUNT: usize = 14;

    /// Every class, in declaration order (matches `index()`)
    pub const ALL: [PlayerClass; Self::COUNT] = [
        PlayerClass::Warrior,
        PlayerClass::Lancer,
        PlayerClass::Slayer,
        PlayerClass::Berserker,
        PlayerClass::Sorcerer,
        PlayerClass::Archer,
        PlayerClass::Priest,
        PlayerClass::Mystic,
        PlayerClass::Reaper,
        PlayerClass::Gunner,
        PlayerClass::Brawler,
        PlayerClass::Ninja,
        PlayerClass::Valkyrie,
        PlayerClass::Common,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case name, also used as the icon file stem
    pub fn name(self) -> &'static str {
        match self {
            PlayerClass::Warrior => "warrior",
            PlayerClass::Lancer => "lancer",
            PlayerClass::Slayer => "slayer",
            PlayerClass::Berserker => "berserker",
            PlayerClass::Sorcerer => "sorcerer",
            PlayerClass::Archer => "archer",
            PlayerClass::Priest => "priest",
            PlayerClass::Mystic => "mystic",
            PlayerClass::Reaper => "reaper",
            PlayerClass::Gunner => "gunner",
            PlayerClass::Brawler => "brawler",
            PlayerClass::Ninja => "ninja",
            PlayerClass::Valkyrie => "valkyrie",
            PlayerClass::Common => "common",
        }
    }
}

impl fmt::Display for PlayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for PlayerClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PlayerClass::ALL
            .into_iter()
            .find(|class| class.name() == wanted)
            .ok_or_else(|| anyhow!("Unknown player class '{}'", s))
    }
}

/// Icon path for every player class, built once and never changed
#[derive(Debug, Clone)]
pub struct ClassIconMap {
    paths: [PathBuf; PlayerClass::COUNT],
}

impl ClassIconMap {
    /// Compute `<resource_dir>/class-icons/<class>.png` for each class.
    /// Files are not checked here; a missing icon is the renderer's problem.
    pub fn build(resource_dir: &Path) -> Self {
        let directory = resource_dir.join(resources::CLASS_ICON_DIR);
        let paths = PlayerClass::ALL.map(|class| {
            directory
                .join(class.name())
                .with_extension(resources::CLASS_ICON_EXTENSION)
        });
        Self { paths }
    }

    pub fn get(&self, class: PlayerClass) -> &Path {
        &self.paths[class.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerClass, &Path)> {
        PlayerClass::ALL
            .into_iter()
            .map(move |class| (class, self.get(class)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_matches_discriminants() {
        for (position, class) in PlayerClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), position);
        }
    }

    #[test]
    fn test_icon_for_every_class() {
        let icons = ClassIconMap::build(Path::new("/opt/meter/resources"));

        let mut seen = HashSet::new();
        for class in PlayerClass::ALL {
            let path = icons.get(class);
            assert!(!path.as_os_str().is_empty());
            assert!(seen.insert(path.to_path_buf()), "duplicate icon path for {class}");
        }
        assert_eq!(seen.len(), PlayerClass::COUNT);
    }

    #[test]
    fn test_icon_path_layout() {
        let icons = ClassIconMap::build(Path::new("/opt/meter/resources"));
        assert_eq!(
            icons.get(PlayerClass::Berserker),
            Path::new("/opt/meter/resources/class-icons/berserker.png")
        );
        assert_eq!(
            icons.get(PlayerClass::Valkyrie),
            Path::new("/opt/meter/resources/class-icons/valkyrie.png")
        );
    }

    #[test]
    fn test_build_does_not_touch_filesystem() {
        let icons = ClassIconMap::build(Path::new("/definitely/not/here"));
        assert!(!icons.get(PlayerClass::Ninja).exists());
        assert_eq!(icons.iter().count(), PlayerClass::COUNT);
    }

    #[test]
    fn test_parse_class_names() {
        assert_eq!("Mystic".parse::<PlayerClass>().unwrap(), PlayerClass::Mystic);
        assert_eq!(" gunner ".parse::<PlayerClass>().unwrap(), PlayerClass::Gunner);
        assert!("paladin".parse::<PlayerClass>().is_err());
        for class in PlayerClass::ALL {
            assert_eq!(class.to_string().parse::<PlayerClass>().unwrap(), class);
        }
    }
}
