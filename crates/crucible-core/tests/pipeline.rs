//! End-to-end pipeline tests against fake toolchain executables.
//!
//! Each fake tool is a small shell script that records its invocation (and
//! sometimes produces output files), so the tests can assert step order,
//! argument construction, and the produced artifacts without a real
//! compiler toolchain.

#![cfg(unix)]

use std::path::{Path, PathBuf};

use crucible_core::builder::{BuildOptions, BuildOrchestrator, StagedBuild};
use crucible_core::certs::CertificateBootstrapper;
use crucible_core::env::BuildEnv;
use crucible_core::exec::Toolchain;
use crucible_core::merge::BinaryMerger;
use crucible_core::paths::InstallPaths;
use crucible_core::platform::{Arch, Capabilities, Os};

/// Write an executable shell script named `name` into `dir`.
fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A fake tool that appends `<label> <args>` to `log` and exits zero.
fn recording_tool(dir: &Path, name: &str, label: &str, log: &Path) -> PathBuf {
    // `echo label "$@"` joins with single spaces and adds no trailing
    // space when the tool is invoked without arguments.
    fake_tool(
        dir,
        name,
        &format!("echo {label} \"$@\" >> {}", log.display()),
    )
}

fn log_lines(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Capabilities for a plain single-arch host with no special behavior.
fn plain_caps() -> Capabilities {
    Capabilities {
        os: Os::Linux,
        native_keychain: false,
        needs_env_flags: false,
        universal_binaries: false,
        zlib_shim: false,
    }
}

fn source_tree(root: &Path) -> PathBuf {
    let src = root.join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("Configure"), "# perl configure script\n").unwrap();
    src
}

#[test]
fn build_runs_steps_in_strict_order() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("invocations.log");
    let tools = tmp.path().join("tools");
    std::fs::create_dir_all(&tools).unwrap();

    let toolchain = Toolchain {
        perl: recording_tool(&tools, "perl", "perl", &log),
        make: recording_tool(&tools, "make", "make", &log),
        lipo: None,
        security: None,
    };
    let caps = plain_caps();
    let env = BuildEnv::default();
    let paths = InstallPaths::new(tmp.path().join("prefix"), None);
    let source = source_tree(tmp.path());
    let build_root = tmp.path().join("build");
    std::fs::create_dir_all(&build_root).unwrap();

    let opts = BuildOptions {
        archs: vec![Arch::X86_64],
        with_tests: true,
    };
    let staged = BuildOrchestrator::new(caps, &toolchain, &env, &paths)
        .build(&source, &build_root, &opts)
        .unwrap();

    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].arch(), Arch::X86_64);
    // The source tree was copied into an isolated build directory.
    assert!(build_root.join("build-x86_64/Configure").exists());

    let lines = log_lines(&log);
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("perl ./Configure --prefix="));
    assert!(lines[0].ends_with("linux-x86_64"));
    assert_eq!(lines[1], "make depend");
    assert_eq!(lines[2], "make");
    assert_eq!(lines[3], "make test");
    assert!(lines[4].starts_with("make install MANDIR="));
    assert!(lines[4].ends_with("MANSUFFIX=ssl"));
}

#[test]
fn skipping_tests_never_invokes_the_test_step() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("invocations.log");
    let tools = tmp.path().join("tools");
    std::fs::create_dir_all(&tools).unwrap();

    let toolchain = Toolchain {
        perl: recording_tool(&tools, "perl", "perl", &log),
        make: recording_tool(&tools, "make", "make", &log),
        lipo: None,
        security: None,
    };
    let caps = plain_caps();
    let env = BuildEnv::default();
    let paths = InstallPaths::new(tmp.path().join("prefix"), None);
    let source = source_tree(tmp.path());
    let build_root = tmp.path().join("build");
    std::fs::create_dir_all(&build_root).unwrap();

    let opts = BuildOptions {
        archs: vec![Arch::X86_64],
        with_tests: false,
    };
    BuildOrchestrator::new(caps, &toolchain, &env, &paths)
        .build(&source, &build_root, &opts)
        .unwrap();

    let lines = log_lines(&log);
    assert!(lines.iter().all(|l| l != "make test"));
    // Everything else still ran.
    assert!(lines.iter().any(|l| l.starts_with("perl ./Configure")));
    assert!(lines.contains(&"make depend".to_string()));
    assert!(lines.contains(&"make".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("make install")));
}

#[test]
fn nonzero_exit_aborts_the_build_immediately() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("invocations.log");
    let tools = tmp.path().join("tools");
    std::fs::create_dir_all(&tools).unwrap();

    let toolchain = Toolchain {
        perl: recording_tool(&tools, "perl", "perl", &log),
        // Fails on the very first make step.
        make: fake_tool(&tools, "make", "exit 2"),
        lipo: None,
        security: None,
    };
    let caps = plain_caps();
    let env = BuildEnv::default();
    let paths = InstallPaths::new(tmp.path().join("prefix"), None);
    let source = source_tree(tmp.path());
    let build_root = tmp.path().join("build");
    std::fs::create_dir_all(&build_root).unwrap();

    let opts = BuildOptions {
        archs: vec![Arch::X86_64, Arch::I386],
        with_tests: true,
    };
    let err = BuildOrchestrator::new(caps, &toolchain, &env, &paths)
        .build(&source, &build_root, &opts)
        .unwrap_err();

    let msg = format!("{err:#}");
    assert!(msg.contains("failed with"), "unexpected error: {msg}");
    // Only the first architecture's configure ran; the second was never
    // started and nothing was installed.
    let lines = log_lines(&log);
    assert_eq!(lines.len(), 1);
    assert!(!build_root.join("build-i386").exists());
}

/// Two fake staging directories with everything the merger expects.
fn fake_staged(root: &Path) -> Vec<StagedBuild> {
    let mut staged = Vec::new();
    for arch in [Arch::X86_64, Arch::I386] {
        let dir = root.join(format!("build-{arch}"));
        std::fs::create_dir_all(dir.join("apps")).unwrap();
        std::fs::create_dir_all(dir.join("engines")).unwrap();
        std::fs::create_dir_all(dir.join("include/openssl")).unwrap();
        for name in ["libcrypto", "libssl"] {
            std::fs::write(dir.join(format!("{name}.1.0.0.dylib")), arch.as_str()).unwrap();
            std::fs::write(dir.join(format!("{name}.a")), arch.as_str()).unwrap();
        }
        std::fs::write(dir.join("apps/openssl"), arch.as_str()).unwrap();
        std::fs::write(dir.join("engines/lib4758cca.dylib"), arch.as_str()).unwrap();
        std::fs::write(
            dir.join("include/openssl/opensslconf.h"),
            format!("#define CONF_FOR_{}\n", arch.guard()),
        )
        .unwrap();
        staged.push(StagedBuild::new(arch, dir));
    }
    staged
}

#[test]
fn merge_fuses_each_artifact_once_and_guards_the_header() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("lipo.log");
    let tools = tmp.path().join("tools");
    std::fs::create_dir_all(&tools).unwrap();

    // Records its arguments and creates the file named after -output.
    let lipo = fake_tool(
        &tools,
        "lipo",
        &format!(
            "echo \"$@\" >> {}\nfor last; do :; done\n: > \"$last\"",
            log.display()
        ),
    );
    let toolchain = Toolchain {
        perl: PathBuf::from("perl"),
        make: PathBuf::from("make"),
        lipo: Some(lipo),
        security: None,
    };
    let paths = InstallPaths::new(tmp.path().join("prefix"), None);
    let staged = fake_staged(tmp.path());

    BinaryMerger::new(&toolchain, &paths)
        .merge(&staged)
        .unwrap();

    let lines = log_lines(&log);
    // libcrypto/libssl shared + static, the executable, and one engine.
    assert_eq!(lines.len(), 6);

    // Scenario: libcrypto.a fused exactly once, with both staged inputs,
    // into the final library path.
    let static_fusions: Vec<_> = lines
        .iter()
        .filter(|l| l.contains("libcrypto.a"))
        .collect();
    assert_eq!(static_fusions.len(), 1);
    let line = static_fusions[0];
    assert!(line.starts_with("-create"));
    assert!(line.contains("build-x86_64/libcrypto.a"));
    assert!(line.contains("build-i386/libcrypto.a"));
    assert!(line.ends_with(&format!(
        "-output {}",
        paths.lib().join("libcrypto.a").display()
    )));

    // Engine plugins fuse by file name into lib/engines/.
    assert!(lines.iter().any(|l| {
        l.contains("build-x86_64/engines/lib4758cca.dylib")
            && l.ends_with(&format!(
                "-output {}",
                paths.engines().join("lib4758cca.dylib").display()
            ))
    }));

    // The executable lands in bin/.
    assert!(
        lines
            .iter()
            .any(|l| l.ends_with(&format!("-output {}", paths.openssl_bin().display())))
    );

    // Merged header: one guarded block per architecture, in list order.
    let header = std::fs::read_to_string(paths.conf_header()).unwrap();
    let x86 = header.find("#ifdef __x86_64__").unwrap();
    let i386 = header.find("#ifdef __i386__").unwrap();
    assert!(x86 < i386);
    assert_eq!(header.matches("#ifdef").count(), 2);
    assert_eq!(header.matches("#endif").count(), 2);
    assert!(header.contains("#define CONF_FOR___x86_64__"));
    assert!(header.contains("#define CONF_FOR___i386__"));
}

#[test]
fn merge_fails_when_an_artifact_is_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let tools = tmp.path().join("tools");
    std::fs::create_dir_all(&tools).unwrap();

    // Behaves like the real fusion tool: a missing input is a hard error.
    let lipo = fake_tool(
        &tools,
        "lipo",
        "shift\nwhile [ \"$1\" != \"-output\" ]; do [ -f \"$1\" ] || exit 1; shift; done\n: > \"$2\"",
    );
    let toolchain = Toolchain {
        perl: PathBuf::from("perl"),
        make: PathBuf::from("make"),
        lipo: Some(lipo),
        security: None,
    };
    let paths = InstallPaths::new(tmp.path().join("prefix"), None);
    let staged = fake_staged(tmp.path());
    std::fs::remove_file(staged[1].root().join("libssl.a")).unwrap();

    let err = BinaryMerger::new(&toolchain, &paths)
        .merge(&staged)
        .unwrap_err();
    assert!(format!("{err:#}").contains("failed with"));
}

const VALID_A: &str = "-----BEGIN CERTIFICATE-----\nQUxQSEE=\n-----END CERTIFICATE-----";
const VALID_B: &str = "-----BEGIN CERTIFICATE-----\nQlJBVk8=\n-----END CERTIFICATE-----";
const EXPIRED: &str = "-----BEGIN CERTIFICATE-----\nEXPIRED\n-----END CERTIFICATE-----";

#[test]
fn bootstrap_keeps_only_certificates_passing_the_expiry_check() {
    let tmp = tempfile::tempdir().unwrap();
    let tools = tmp.path().join("tools");
    std::fs::create_dir_all(&tools).unwrap();

    // Dumps two valid certificates and one expired one, with the noise a
    // real keychain dump carries between blocks.
    let dump = format!("keychain: \"/Library/...\"\n{VALID_A}\n{EXPIRED}\nversion: 1\n{VALID_B}\n");
    let security = fake_tool(&tools, "security", &format!("cat <<'EOF'\n{dump}EOF"));

    // Stand-in for `openssl x509 -checkend 0`: rejects PEM text carrying
    // the EXPIRED marker.
    let prefix = tmp.path().join("prefix");
    std::fs::create_dir_all(prefix.join("bin")).unwrap();
    fake_tool(
        &prefix.join("bin"),
        "openssl",
        "if grep -q EXPIRED; then exit 1; fi\nexit 0",
    );

    let paths = InstallPaths::new(prefix, None);
    let kept = CertificateBootstrapper::new(security, &paths)
        .with_keychains(vec![tmp.path().join("fake.keychain")])
        .bootstrap()
        .unwrap();

    assert_eq!(kept, 2);
    let store = std::fs::read_to_string(paths.cert_pem()).unwrap();
    assert_eq!(store, format!("{VALID_A}\n\n{VALID_B}"));

    // Atomic replace: no staging file left next to the store.
    let siblings: Vec<_> = std::fs::read_dir(paths.openssldir())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(siblings, ["cert.pem"]);
}

#[test]
fn bootstrap_fails_when_the_keychain_query_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let tools = tmp.path().join("tools");
    std::fs::create_dir_all(&tools).unwrap();

    let security = fake_tool(&tools, "security", "exit 1");
    let prefix = tmp.path().join("prefix");
    std::fs::create_dir_all(prefix.join("bin")).unwrap();
    fake_tool(&prefix.join("bin"), "openssl", "exit 0");

    let paths = InstallPaths::new(prefix, None);
    let err = CertificateBootstrapper::new(security, &paths)
        .with_keychains(vec![tmp.path().join("fake.keychain")])
        .bootstrap()
        .unwrap_err();

    assert!(format!("{err:#}").contains("keychain query"));
    assert!(!paths.cert_pem().exists());
}

#[test]
fn post_install_check_accepts_the_known_digest() {
    let tmp = tempfile::tempdir().unwrap();
    let prefix = tmp.path().join("prefix");
    std::fs::create_dir_all(prefix.join("bin")).unwrap();

    // Emits the checksum report the real binary would write for the
    // fixed input.
    fake_tool(
        &prefix.join("bin"),
        "openssl",
        &format!(
            "echo \"SHA256(testfile.txt)= {}\" > \"$4\"",
            crucible_core::check::EXPECTED_DIGEST
        ),
    );

    let paths = InstallPaths::new(prefix, None);
    std::fs::create_dir_all(paths.openssldir()).unwrap();
    std::fs::write(paths.openssl_cnf(), "# config\n").unwrap();

    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    crucible_core::check::run(&paths, &work).unwrap();
}

#[test]
fn post_install_check_rejects_a_wrong_digest() {
    let tmp = tempfile::tempdir().unwrap();
    let prefix = tmp.path().join("prefix");
    std::fs::create_dir_all(prefix.join("bin")).unwrap();
    fake_tool(
        &prefix.join("bin"),
        "openssl",
        "echo \"SHA256(testfile.txt)= deadbeef\" > \"$4\"",
    );

    let paths = InstallPaths::new(prefix, None);
    std::fs::create_dir_all(paths.openssldir()).unwrap();
    std::fs::write(paths.openssl_cnf(), "# config\n").unwrap();

    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    let err = crucible_core::check::run(&paths, &work).unwrap_err();
    assert!(format!("{err:#}").contains("digest mismatch"));
}
