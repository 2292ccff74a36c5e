use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Category {
    pub title: &'static str,
    pub path: &'static str,
    pub icon: &'static str,
}

const fn category(title: &'static str, path: &'static str, icon: &'static str) -> Category {
    Category { title, path, icon }
}

/// Language categories shown on the landing page, in display order.
pub const CATEGORIES: [Category; 12] = [
    category("English", "english", "https://flagcdn.com/gb.svg"),
    category("Spanish", "spanish", "https://flagcdn.com/es.svg"),
    category("French", "french", "https://flagcdn.com/fr.svg"),
    category("German", "german", "https://flagcdn.com/de.svg"),
    category("Italian", "italian", "https://flagcdn.com/it.svg"),
    category("Portuguese", "portuguese", "https://flagcdn.com/pt.svg"),
    category("Japanese", "japanese", "https://flagcdn.com/jp.svg"),
    category("Chinese", "chinese", "https://flagcdn.com/cn.svg"),
    category("Korean", "korean", "https://flagcdn.com/kr.svg"),
    category("Arabic", "arabic", "https://flagcdn.com/sa.svg"),
    category("Russian", "russian", "https://flagcdn.com/ru.svg"),
    category("Hindi", "hindi", "https://flagcdn.com/in.svg"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_unique_lowercase_titles() {
        for (i, c) in CATEGORIES.iter().enumerate() {
            assert_eq!(c.path, c.title.to_lowercase());
            assert!(CATEGORIES[i + 1..].iter().all(|other| other.path != c.path));
        }
    }
}
