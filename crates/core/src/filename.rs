use chrono::NaiveDate;

/// Length of the `YYYY-MM` month token at the start of a backup name.
const MONTH_LEN: usize = 7;
/// Extension length stripped from the entity field, e.g. `.tar.gz`.
const SUFFIX_LEN: usize = 7;
/// `YYYY-MM-DD-<entity><suffix>` splits into exactly this many fields.
const ENTITY_FIELDS: usize = 4;

/// What a backup filename says about itself.
///
/// Producers do not always follow the naming convention, so parsing never
/// fails: a name without a leading date still yields a month key (its first
/// seven characters) and an empty entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFilename<'a> {
    pub month: &'a str,
    pub date: Option<NaiveDate>,
    pub entity: &'a str,
}

impl<'a> BackupFilename<'a> {
    pub fn is_well_formed(&self) -> bool {
        self.date.is_some()
    }

    /// Retention group: `(month, entity)`.
    pub fn group_key(&self) -> (&'a str, &'a str) {
        (self.month, self.entity)
    }
}

pub fn parse_backup_filename(name: &str) -> BackupFilename<'_> {
    BackupFilename {
        month: take_chars(name, MONTH_LEN),
        date: parse_date(name),
        entity: parse_entity(name),
    }
}

fn parse_date(name: &str) -> Option<NaiveDate> {
    let token = name.get(..10)?;
    if !name[10..].starts_with('-') {
        return None;
    }
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

fn parse_entity(name: &str) -> &str {
    let fields: Vec<&str> = name.split('-').collect();
    if fields.len() != ENTITY_FIELDS {
        return "";
    }
    let field = fields[ENTITY_FIELDS - 1];
    let keep = field.chars().count().saturating_sub(SUFFIX_LEN);
    take_chars(field, keep)
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
