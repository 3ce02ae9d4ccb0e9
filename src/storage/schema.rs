//! Database schema definitions

/// SQL to create the voters table
pub const CREATE_VOTERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS voters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    epic_no TEXT,
    name TEXT NOT NULL,
    relative_name TEXT,
    age INTEGER,
    gender TEXT,
    mobile_number TEXT,
    linked_mobile TEXT,
    booth_no INTEGER,
    village_name TEXT,
    panchayat_id INTEGER,
    caste_code TEXT,
    is_linked INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the families table
/// A family name is unique within its booth
pub const CREATE_FAMILIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS families (
    family_id INTEGER PRIMARY KEY AUTOINCREMENT,
    booth_no INTEGER NOT NULL,
    village_name TEXT,
    family_name TEXT NOT NULL,
    contact_no TEXT,
    caste_code TEXT,
    party_support TEXT NOT NULL DEFAULT 'OTHERS',
    panchayat_id INTEGER,
    UNIQUE(booth_no, family_name)
)
"#;

/// SQL to create the family_members table
/// A voter belongs to at most one family
pub const CREATE_FAMILY_MEMBERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS family_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    family_id INTEGER NOT NULL REFERENCES families(family_id),
    voter_id INTEGER NOT NULL UNIQUE,
    voter_name TEXT,
    age INTEGER,
    gender TEXT
)
"#;

pub const CREATE_PANCHAYATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS panchayats (
    panchayat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    panchayat_name TEXT NOT NULL UNIQUE
)
"#;

pub const CREATE_BOOTHS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS booths (
    booth_id INTEGER PRIMARY KEY AUTOINCREMENT,
    booth_no INTEGER NOT NULL UNIQUE,
    panchayat_id INTEGER,
    total_villages INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_VILLAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS villages (
    village_id INTEGER PRIMARY KEY AUTOINCREMENT,
    booth_no INTEGER NOT NULL,
    village_name TEXT NOT NULL,
    UNIQUE(booth_no, village_name)
)
"#;

pub const CREATE_CASTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS castes (
    caste_id INTEGER PRIMARY KEY AUTOINCREMENT,
    caste_name TEXT NOT NULL UNIQUE,
    caste_code TEXT
)
"#;

pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    native_place TEXT,
    mobile TEXT,
    panchayat TEXT,
    event_date TEXT NOT NULL,
    description TEXT
)
"#;

pub const CREATE_VISITORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS visitors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    native_place TEXT,
    village TEXT,
    mobile TEXT NOT NULL,
    visit_date TEXT NOT NULL
)
"#;

pub const CREATE_PARTY_LEADERSHIP_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS party_leadership (
    s_no INTEGER PRIMARY KEY AUTOINCREMENT,
    union_name TEXT,
    panchayat_name TEXT,
    branch_name TEXT,
    leader_name TEXT NOT NULL,
    phone_number TEXT NOT NULL
)
"#;

/// SQL to create the election_results table
/// One row per booth station, populated by the bulk importer
pub const CREATE_ELECTION_RESULTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS election_results (
    booth_station TEXT,
    dravida_munnetra_kazhagam INTEGER,
    desiya_murpokku_dravidar_kazhagam INTEGER,
    all_india_anna_dravidar_munnetra_kazhagam INTEGER,
    indiya_jananayaka_katchi INTEGER,
    naam_tamilar_katchi INTEGER,
    total_valid_votes INTEGER,
    rejected_votes INTEGER,
    nota INTEGER,
    total_votes INTEGER
)
"#;

pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'staff'
)
"#;

pub const CREATE_MESSAGE_LOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS message_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    phone TEXT NOT NULL,
    message TEXT NOT NULL,
    image_url TEXT,
    source TEXT NOT NULL,
    status TEXT NOT NULL,
    sent_by TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_voters_booth ON voters(booth_no, is_linked)",
    "CREATE INDEX IF NOT EXISTS idx_voters_panchayat ON voters(panchayat_id)",
    "CREATE INDEX IF NOT EXISTS idx_members_family ON family_members(family_id)",
    "CREATE INDEX IF NOT EXISTS idx_families_booth ON families(booth_no)",
    "CREATE INDEX IF NOT EXISTS idx_results_booth ON election_results(booth_station)",
    "CREATE INDEX IF NOT EXISTS idx_events_date ON events(event_date)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_VOTERS_TABLE,
        CREATE_FAMILIES_TABLE,
        CREATE_FAMILY_MEMBERS_TABLE,
        CREATE_PANCHAYATS_TABLE,
        CREATE_BOOTHS_TABLE,
        CREATE_VILLAGES_TABLE,
        CREATE_CASTES_TABLE,
        CREATE_EVENTS_TABLE,
        CREATE_VISITORS_TABLE,
        CREATE_PARTY_LEADERSHIP_TABLE,
        CREATE_ELECTION_RESULTS_TABLE,
        CREATE_USERS_TABLE,
        CREATE_MESSAGE_LOG_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
