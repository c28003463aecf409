use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

/// Collapse an enumeration token for comparison: trim, lowercase, and treat
/// underscores/hyphens as spaces so "Ultra Rare", "ultra_rare" and
/// "ULTRA-RARE" all land on the same form.
fn fold_token(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.trim().chars() {
        let ch = match ch {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        };
        if ch == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

macro_rules! categorical {
    ($name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// Accepts the display value or the symbolic variant name,
            /// tolerant of case and space/underscore formatting.
            pub fn parse(input: &str) -> Option<$name> {
                let folded = fold_token(input);
                if folded.is_empty() {
                    return None;
                }
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| fold_token(v.as_str()) == folded)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                $name::parse(s).ok_or(FromSqlError::InvalidType)
            }
        }
    };
}

categorical!(Rarity {
    Common => "Common",
    Uncommon => "Uncommon",
    Rare => "Rare",
    UltraRare => "Ultra Rare",
    SecretRare => "Secret Rare",
    Promo => "Promo",
});

categorical!(Condition {
    Mint => "MINT",
    NearMint => "NM",
    LightlyPlayed => "LP",
    ModeratelyPlayed => "MP",
    HeavilyPlayed => "HP",
    Damaged => "Damaged",
});

categorical!(Language {
    Es => "ES",
    En => "EN",
    Jp => "JP",
    Pt => "PT",
    Fr => "FR",
    De => "DE",
    It => "IT",
    Cn => "CN",
    Kr => "KR",
});

// "comercial" is the canonical wire spelling (CSV column, form field); it is
// kept verbatim for compatibility with existing exports.
categorical!(ComercialCondition {
    Collection => "Collection",
    Trade => "Trade",
    Sell => "Sell",
    Reserved => "Reserved",
});

impl Default for ComercialCondition {
    fn default() -> Self {
        ComercialCondition::Collection
    }
}

/// A persisted catalog item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRecord {
    pub id: i64,
    pub name: String,
    pub game: String,
    pub set_name: String,
    pub set_code: Option<String>,
    pub number_set: i64,
    pub rarity: Rarity,
    pub condition: Condition,
    pub language: Language,
    pub quantity: i64,
    pub location: Option<String>,
    pub comercial_condition: ComercialCondition,
    pub variant: Option<String>,
    pub notes: Option<String>,
    pub image_path: Option<String>,
}

/// A validated item payload, ready to insert or apply.
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub name: String,
    pub game: String,
    pub set_name: String,
    pub set_code: Option<String>,
    pub number_set: i64,
    pub rarity: Rarity,
    pub condition: Condition,
    pub language: Language,
    pub quantity: i64,
    pub location: Option<String>,
    pub comercial_condition: ComercialCondition,
    pub variant: Option<String>,
    pub notes: Option<String>,
}

/// Raw field values as they arrive from a form or a CSV row. All optional;
/// `validate` decides what is required.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: Option<String>,
    pub game: Option<String>,
    pub set_name: Option<String>,
    pub set_code: Option<String>,
    pub number_set: Option<String>,
    pub rarity: Option<String>,
    pub condition: Option<String>,
    pub language: Option<String>,
    pub quantity: Option<String>,
    pub location: Option<String>,
    pub comercial_condition: Option<String>,
    pub variant: Option<String>,
    pub notes: Option<String>,
}

/// Trim; an empty result means "absent".
pub fn normalize_opt(value: Option<&str>) -> Option<String> {
    let v = value?.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

impl ItemDraft {
    pub fn validate(&self) -> Result<ItemInput, Vec<String>> {
        let mut errors = Vec::new();

        let name = normalize_opt(self.name.as_deref());
        let game = normalize_opt(self.game.as_deref());
        let set_name = normalize_opt(self.set_name.as_deref());
        let set_code = normalize_opt(self.set_code.as_deref());
        let location = normalize_opt(self.location.as_deref());
        let variant = normalize_opt(self.variant.as_deref());
        let notes = normalize_opt(self.notes.as_deref());

        if name.is_none() {
            errors.push("The name is required.".to_string());
        }
        if game.is_none() {
            errors.push("The game is required.".to_string());
        }
        if set_name.is_none() {
            errors.push("The set is required.".to_string());
        }

        let number_set = match normalize_opt(self.number_set.as_deref()) {
            None => {
                errors.push("The number in set is required.".to_string());
                None
            }
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    errors.push("The number in set must be an integer.".to_string());
                    None
                }
            },
        };

        let quantity = match normalize_opt(self.quantity.as_deref()) {
            None => Some(0),
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 0 => Some(n),
                _ => {
                    errors.push("The quantity must be an integer >= 0.".to_string());
                    None
                }
            },
        };

        let rarity = match normalize_opt(self.rarity.as_deref()) {
            None => {
                errors.push("The rarity is required.".to_string());
                None
            }
            Some(raw) => match Rarity::parse(&raw) {
                Some(v) => Some(v),
                None => {
                    errors.push("Invalid Rarity.".to_string());
                    None
                }
            },
        };
        let condition = match normalize_opt(self.condition.as_deref()) {
            None => {
                errors.push("The condition is required.".to_string());
                None
            }
            Some(raw) => match Condition::parse(&raw) {
                Some(v) => Some(v),
                None => {
                    errors.push("Invalid Condition.".to_string());
                    None
                }
            },
        };
        let language = match normalize_opt(self.language.as_deref()) {
            None => {
                errors.push("The language is required.".to_string());
                None
            }
            Some(raw) => match Language::parse(&raw) {
                Some(v) => Some(v),
                None => {
                    errors.push("Invalid Language.".to_string());
                    None
                }
            },
        };
        let comercial_condition = match normalize_opt(self.comercial_condition.as_deref()) {
            None => Some(ComercialCondition::default()),
            Some(raw) => match ComercialCondition::parse(&raw) {
                Some(v) => Some(v),
                None => {
                    errors.push("Invalid Comercial Condition.".to_string());
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ItemInput {
            name: name.unwrap(),
            game: game.unwrap(),
            set_name: set_name.unwrap(),
            set_code,
            number_set: number_set.unwrap(),
            rarity: rarity.unwrap(),
            condition: condition.unwrap(),
            language: language.unwrap(),
            quantity: quantity.unwrap(),
            location,
            comercial_condition: comercial_condition.unwrap(),
            variant,
            notes,
        })
    }
}

/// A tag with its usage count.
#[derive(Debug, Clone, Serialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub item_count: i64,
}
