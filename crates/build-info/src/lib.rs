use once_cell::sync::Lazy;

#[derive(Debug)]
struct BuildMeta {
    build_id: String,
    build_time: String,
    git_label: String,
}

impl BuildMeta {
    fn collect() -> Self {
        let build_id = option_env!("DEBUGD_BUILD_ID")
            .unwrap_or("unknown build")
            .to_string();
        let build_time = option_env!("DEBUGD_BUILD_TIME")
            .unwrap_or("unknown time")
            .to_string();
        let git_label = option_env!("DEBUGD_BUILD_GIT")
            .unwrap_or("unknown git")
            .to_string();
        Self {
            build_id,
            build_time,
            git_label,
        }
    }
}

static META: Lazy<BuildMeta> = Lazy::new(BuildMeta::collect);

/// Full build identifier (e.g. "2025-10-05 15:47:12 UTC | v1.2.3-8a4f1d2").
pub fn build_id() -> &'static str {
    META.build_id.as_str()
}

/// Human-readable UTC timestamp captured at build time.
pub fn build_timestamp() -> &'static str {
    META.build_time.as_str()
}

/// Git label (tag/commit) detected at build time.
pub fn git_label() -> &'static str {
    META.git_label.as_str()
}

/// Ready-to-log banner for a specific binary.
pub fn formatted_banner(package: &str, version: &str) -> String {
    format!("{} {} | {}", package, version, build_id())
}
