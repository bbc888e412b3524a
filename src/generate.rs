//! Generators for the output files.
//!
//! `CMakeLists.txt` and the setup script are assembled as line vectors and
//! joined at the end, so two runs over identical inputs produce
//! byte-identical files. Module search-path directories are deduplicated
//! and sorted before emission to keep diffs minimal regardless of
//! discovery order.

use crate::assemble::{DOWNLOAD_DIR, Module};
use crate::config::Config;
use anyhow::Result;
use chrono::Datelike;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub fn autogenerated_notice() -> String {
    let year_range = format!("2015-{}", chrono::Local::now().year());
    format!(
        "# This file is autogenerated by Autocmake http://autocmake.org\n# Copyright (c) {} by Radovan Bast and Jonas Juselius",
        year_range
    )
}

/// Generate the CMakeLists.txt text.
///
/// `relative_path` points from the project root back to the working
/// directory holding the modules.
pub fn gen_cmakelists(
    project_name: &str,
    min_cmake_version: &str,
    relative_path: &Path,
    modules: &[Module],
) -> String {
    let mut s: Vec<String> = Vec::new();

    s.push(autogenerated_notice());

    s.push("\n# set minimum cmake version".to_string());
    s.push(format!(
        "cmake_minimum_required(VERSION {} FATAL_ERROR)",
        min_cmake_version
    ));

    s.push("\n# project name".to_string());
    s.push(format!("project({})", project_name));

    s.push("\n# do not rebuild if rules (compiler flags) change".to_string());
    s.push("set(CMAKE_SKIP_RULE_DEPENDENCY TRUE)".to_string());

    s.push("\n# if CMAKE_BUILD_TYPE undefined, we set it to Debug".to_string());
    s.push("if(NOT CMAKE_BUILD_TYPE)".to_string());
    s.push("    set(CMAKE_BUILD_TYPE \"Debug\")".to_string());
    s.push("endif()".to_string());

    if !modules.is_empty() {
        s.push("\n# directories which hold included cmake modules".to_string());
    }

    // "downloaded" is always searched so that fetched modules are found
    // when testing; dedup and sort for stable output
    let mut seen = HashSet::new();
    let mut module_paths: Vec<String> = modules
        .iter()
        .map(|module| module.path.to_string_lossy().into_owned())
        .chain(std::iter::once(DOWNLOAD_DIR.to_string()))
        .filter(|path| seen.insert(path.clone()))
        .collect();
    module_paths.sort();

    for directory in &module_paths {
        // cmake wants forward slashes, also on windows
        let rel = relative_path.join(directory).to_string_lossy().replace('\\', "/");
        s.push(format!(
            "set(CMAKE_MODULE_PATH ${{CMAKE_MODULE_PATH}} ${{PROJECT_SOURCE_DIR}}/{})",
            rel
        ));
    }

    if !modules.is_empty() {
        s.push("\n# included cmake modules".to_string());
    }
    for module in modules {
        let stem = Path::new(&module.name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| module.name.clone());
        s.push(format!("include({})", stem));
    }

    s.join("\n") + "\n"
}

/// Generate the setup script text: a Python script that parses the
/// generated option block with docopt and hands the assembled cmake
/// command to the bootstrap `config` module.
pub fn gen_setup(config: &Config, relative_path: &Path, setup_script_name: &str) -> String {
    let mut s: Vec<String> = Vec::new();

    s.push("#!/usr/bin/env python".to_string());
    s.push(format!("\n{}", autogenerated_notice()));
    s.push("\nimport os".to_string());
    s.push("import sys".to_string());

    s.push(format!(
        "\nsys.path.insert(0, '{}')",
        relative_path.to_string_lossy()
    ));
    s.push(format!(
        "sys.path.insert(0, '{}')",
        relative_path.join("lib").to_string_lossy()
    ));
    s.push(format!(
        "sys.path.insert(0, '{}')",
        relative_path.join("lib").join("docopt").to_string_lossy()
    ));

    s.push("import config".to_string());
    s.push("import docopt".to_string());

    s.push("\n\noptions = \"\"\"".to_string());
    s.push("Usage:".to_string());
    s.push(format!("  ./{} [options] [<builddir>]", setup_script_name));
    s.push(format!("  ./{} (-h | --help)", setup_script_name));
    s.push("\nOptions:".to_string());

    // module-declared options come first, built-in options after
    let mut options: Vec<(String, String)> = Vec::new();
    for section in config.sections.values() {
        if let Some(docopt) = section.get("docopt") {
            for opt in docopt.split('\n') {
                let mut words = opt.split_whitespace();
                let first = words.next().unwrap_or("").to_string();
                let rest = words.collect::<Vec<_>>().join(" ");
                options.push((first, rest));
            }
        }
    }

    options.push((
        "--type=<TYPE>".to_string(),
        "Set the CMake build type (debug, release, or relwithdeb) [default: release].".to_string(),
    ));
    options.push((
        "--generator=<STRING>".to_string(),
        "Set the CMake build system generator [default: Unix Makefiles].".to_string(),
    ));
    options.push(("--show".to_string(), "Show CMake command and exit.".to_string()));
    options.push((
        "--cmake-executable=<CMAKE_EXECUTABLE>".to_string(),
        "Set the CMake executable [default: cmake].".to_string(),
    ));
    options.push((
        "--cmake-options=<STRING>".to_string(),
        "Define options to CMake [default: ''].".to_string(),
    ));
    options.push((
        "--prefix=<PATH>".to_string(),
        "Set the install path for make install.".to_string(),
    ));
    options.push(("<builddir>".to_string(), "Build directory.".to_string()));
    options.push(("-h --help".to_string(), "Show this screen.".to_string()));

    s.push(align_options(&options));
    s.push("\"\"\"".to_string());

    s.push(gen_cmake_command(config));

    s.push("\n".to_string());
    s.push("# parse command line args".to_string());
    s.push("try:".to_string());
    s.push("    arguments = docopt.docopt(options, argv=None)".to_string());
    s.push("except docopt.DocoptExit:".to_string());
    s.push("    sys.stderr.write('ERROR: bad input to {}\\n'.format(sys.argv[0]))".to_string());
    s.push("    sys.stderr.write(options)".to_string());
    s.push("    sys.exit(-1)".to_string());
    s.push("\n".to_string());
    s.push("# use extensions to validate/post-process args".to_string());
    s.push("if config.module_exists('extensions'):".to_string());
    s.push("    import extensions".to_string());
    s.push("    arguments = extensions.postprocess_args(sys.argv, arguments)".to_string());
    s.push("\n".to_string());
    s.push("root_directory = os.path.dirname(os.path.realpath(__file__))".to_string());
    s.push("\n".to_string());
    s.push("build_path = arguments['<builddir>']".to_string());
    s.push("\n".to_string());
    s.push("# create cmake command".to_string());
    s.push(
        "cmake_command = '{0} {1}'.format(gen_cmake_command(options, arguments), root_directory)"
            .to_string(),
    );
    s.push("\n".to_string());
    s.push("# run cmake".to_string());
    s.push("config.configure(root_directory, build_path, cmake_command, arguments['--show'])".to_string());

    s.join("\n") + "\n"
}

// the gen_cmake_command function embedded in the setup script; environment
// exports must precede the executable, definitions follow it
fn gen_cmake_command(config: &Config) -> String {
    let mut s: Vec<String> = Vec::new();

    s.push("\n\ndef gen_cmake_command(options, arguments):".to_string());
    s.push("    \"\"\"".to_string());
    s.push("    Generate CMake command based on options and arguments.".to_string());
    s.push("    \"\"\"".to_string());
    s.push("    command = []".to_string());

    for section in config.sections.values() {
        if let Some(export) = section.get("export") {
            for env in export.split('\n') {
                s.push(format!("    command.append({})", env));
            }
        }
    }

    s.push("    command.append(arguments['--cmake-executable'])".to_string());

    for section in config.sections.values() {
        if let Some(define) = section.get("define") {
            for definition in define.split('\n') {
                s.push(format!("    command.append({})", definition));
            }
        }
    }

    s.push("    command.append('-DCMAKE_BUILD_TYPE={}'.format(arguments['--type']))".to_string());
    s.push("    command.append('-G \"{}\"'.format(arguments['--generator']))".to_string());
    s.push("    if arguments['--cmake-options'] != \"''\":".to_string());
    s.push("        command.append(arguments['--cmake-options'])".to_string());
    s.push("    if arguments['--prefix']:".to_string());
    s.push(
        "        command.append('-DCMAKE_INSTALL_PREFIX=\"{0}\"'.format(arguments['--prefix']))"
            .to_string(),
    );

    s.push("\n    return ' '.join(command)".to_string());

    s.join("\n")
}

/// Indent flags and align their help texts into a column.
fn align_options(options: &[(String, String)]) -> String {
    let width = options.iter().map(|(flag, _)| flag.len()).max().unwrap_or(0);
    options
        .iter()
        .map(|(flag, help)| format!("  {}{}  {}", flag, " ".repeat(width - flag.len()), help))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Path of `target` expressed relative to `base`. Both must be absolute.
pub fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target_parts: Vec<_> = target.components().collect();
    let base_parts: Vec<_> = base.components().collect();

    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &target_parts[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Copy the read bits to the execute bits, so the setup script can be run
/// directly.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    permissions.set_mode(mode | ((mode & 0o444) >> 2));
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
