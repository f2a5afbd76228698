//! Embeds the injector class and the class bundle.
//!
//! Reads `JVMINJECT_CLASSES_DIR` (see `src/bundle.rs` for the layout) and writes
//! `$OUT_DIR/embedded.rs`. Without the variable, stub resources are generated.

use std::{
    env,
    fmt::Write as _,
    fs,
    io,
    path::{Path, PathBuf},
};

const STUB_CLASS_NAME: &str = "jvminject/stub/Injector";

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-env-changed=JVMINJECT_CLASSES_DIR");

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR is not set"))?;
    let source = match env::var_os("JVMINJECT_CLASSES_DIR") {
        Some(dir) => generate(Path::new(&dir))?,
        None => stub(),
    };

    fs::write(out_dir.join("embedded.rs"), source)
}

fn stub() -> String {
    format!(
        "pub(crate) static INJECTOR_CLASS_NAME: &str = {STUB_CLASS_NAME:?};\n\
         pub(crate) static INJECTOR_CLASS: &[u8] = &[];\n\
         pub(crate) static CLASS_DATA: &[&[u8]] = &[];\n\
         pub(crate) static CLASS_SIZES: &[usize] = &[];\n"
    )
}

fn generate(dir: &Path) -> io::Result<String> {
    println!("cargo:rerun-if-changed={}", dir.display());

    let name = fs::read_to_string(dir.join("injector.name"))?;
    let injector = fs::canonicalize(dir.join("injector.class"))?;

    let mut classes = Vec::new();
    let classes_dir = dir.join("classes");
    if classes_dir.is_dir() {
        for entry in fs::read_dir(&classes_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "class") {
                classes.push(fs::canonicalize(path)?);
            }
        }
    }
    classes.sort();

    let mut source = String::new();
    let _ = writeln!(
        source,
        "pub(crate) static INJECTOR_CLASS_NAME: &str = {:?};",
        name.trim()
    );
    let _ = writeln!(
        source,
        "pub(crate) static INJECTOR_CLASS: &[u8] = include_bytes!({:?});",
        injector.display().to_string()
    );

    source.push_str("pub(crate) static CLASS_DATA: &[&[u8]] = &[\n");
    for class in &classes {
        let _ = writeln!(source, "    include_bytes!({:?}),", class.display().to_string());
    }
    source.push_str("];\n");

    source.push_str("pub(crate) static CLASS_SIZES: &[usize] = &[\n");
    for class in &classes {
        let _ = writeln!(source, "    {},", fs::metadata(class)?.len());
    }
    source.push_str("];\n");

    Ok(source)
}
