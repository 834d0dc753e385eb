//! Heuristic selection of the release asset that fits a target os/arch.

use crate::source::Asset;

/// Files published next to binaries that are never the artifact itself.
const IGNORED_SUFFIXES: &[&str] = &[
    ".sha256", ".sha256sum", ".sha512", ".md5", ".sig", ".asc", ".pem", ".sbom", ".spdx",
    ".json", ".txt", ".deb", ".rpm", ".apk", ".msi", ".pkg", ".dmg",
];

fn os_aliases(os: &str) -> &'static [&'static str] {
    match os {
        "linux" => &["linux"],
        "darwin" => &["darwin", "macos", "apple", "osx"],
        "windows" => &["windows", "win64", "win32", ".exe"],
        "freebsd" => &["freebsd"],
        _ => &[],
    }
}

fn arch_aliases(arch: &str) -> &'static [&'static str] {
    match arch {
        "amd64" => &["amd64", "x86_64", "x64", "64bit"],
        "arm64" => &["arm64", "aarch64"],
        "386" => &["i386", "i686", "386", "32bit"],
        "arm" => &["armv7", "armhf", "arm"],
        _ => &[],
    }
}

/// Pick the best asset for `os`/`arch`. The os must match; an arch match (or a
/// `universal` build) is required as well. Ties go to the shorter name.
pub fn select_asset<'a>(assets: &'a [Asset], os: &str, arch: &str) -> Option<&'a Asset> {
    let os_names = os_aliases(os);
    let arch_names = arch_aliases(arch);

    let mut scored: Vec<(u8, &Asset)> = assets
        .iter()
        .filter_map(|asset| {
            let name = asset.name.to_ascii_lowercase();
            if IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                return None;
            }
            if !os_names.iter().any(|o| name.contains(o)) {
                return None;
            }
            // 32-bit `arm` must not pick up arm64 builds.
            let arch_hit = arch_names.iter().any(|a| name.contains(a))
                && !(arch == "arm" && (name.contains("arm64") || name.contains("aarch64")));
            let score = if arch_hit {
                2
            } else if name.contains("universal") || name.contains("_all") {
                1
            } else {
                return None;
            };
            Some((score, asset))
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then(a.name.len().cmp(&b.name.len())));
    scored.first().map(|(_, a)| *a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(names: &[&str]) -> Vec<Asset> {
        names
            .iter()
            .map(|n| Asset {
                name: n.to_string(),
                url: format!("https://dl/{n}"),
            })
            .collect()
    }

    #[test]
    fn picks_matching_os_and_arch() {
        let list = assets(&[
            "tool_1.0.0_checksums.txt",
            "tool_1.0.0_darwin_arm64.tar.gz",
            "tool_1.0.0_linux_amd64.tar.gz",
            "tool_1.0.0_linux_amd64.tar.gz.sha256",
            "tool_1.0.0_linux_arm64.tar.gz",
        ]);
        let pick = select_asset(&list, "linux", "amd64").unwrap();
        assert_eq!(pick.name, "tool_1.0.0_linux_amd64.tar.gz");
        let pick = select_asset(&list, "darwin", "arm64").unwrap();
        assert_eq!(pick.name, "tool_1.0.0_darwin_arm64.tar.gz");
    }

    #[test]
    fn accepts_rust_style_triples() {
        let list = assets(&[
            "rg-14.0.0-x86_64-unknown-linux-musl.tar.gz",
            "rg-14.0.0-aarch64-apple-darwin.tar.gz",
            "rg-14.0.0-x86_64-pc-windows-msvc.zip",
        ]);
        assert_eq!(
            select_asset(&list, "linux", "amd64").unwrap().name,
            "rg-14.0.0-x86_64-unknown-linux-musl.tar.gz"
        );
        assert_eq!(
            select_asset(&list, "windows", "amd64").unwrap().name,
            "rg-14.0.0-x86_64-pc-windows-msvc.zip"
        );
    }

    #[test]
    fn arm_does_not_match_arm64() {
        let list = assets(&["t-linux-arm64.tar.gz", "t-linux-armv7.tar.gz"]);
        assert_eq!(
            select_asset(&list, "linux", "arm").unwrap().name,
            "t-linux-armv7.tar.gz"
        );
    }

    #[test]
    fn universal_build_is_a_fallback() {
        let list = assets(&["t-darwin-universal.tar.gz"]);
        assert!(select_asset(&list, "darwin", "arm64").is_some());
        assert!(select_asset(&list, "linux", "amd64").is_none());
    }
}
