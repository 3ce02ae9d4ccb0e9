pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const FILE: &str = "📄";
    pub const BALLOT: &str = "🗳️";
    pub const TROPHY: &str = "🏆";
    pub const PERSON: &str = "👤";
    pub const CLOCK: &str = "⏱️";
    pub const GLOBE: &str = "🌍";
}
