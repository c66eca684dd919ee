use std::io::{Result, Write};

use super::{Attributes, Manifest};
use crate::wrap::LineWrapWriter;

fn write_section(writer: &mut impl Write, name: &str, attributes: &Attributes) -> Result<()> {
    write!(writer, "Name: {name}\r\n")?;
    for line in attributes.lines() {
        write!(writer, "{line}\r\n")?;
    }
    Ok(())
}

impl Manifest {
    /// Writes the manifest in its wire format.
    ///
    /// The main section comes first, followed by every named section that has at least one
    /// attribute, sorted by name.  Each section is followed by a blank line and all lines are
    /// wrapped at 72 bytes.  The output of this function is exactly what gets hashed for the
    /// `SHA1-Digest-Manifest` attribute of a signature file.
    pub fn write_to(&self, writer: impl Write) -> Result<()> {
        let mut writer = LineWrapWriter::new(writer);

        for line in self.main().into_iter().flat_map(Attributes::lines) {
            write!(writer, "{line}\r\n")?;
        }

        for (name, attributes) in self.entries() {
            if attributes.is_empty() {
                continue;
            }
            writer.write_all(b"\r\n")?;
            write_section(&mut writer, name, attributes)?;
        }

        writer.write_all(b"\r\n")?;
        writer.flush()
    }

    /// Writes the block of a single named section on its own: the `Name:` header and the
    /// attribute lines, wrapped the same way as by [`Manifest::write_to()`], without any
    /// surrounding blank lines.  A section that doesn't exist produces a bare `Name:` header.
    pub fn write_entry(&self, writer: impl Write, name: &str) -> Result<()> {
        let mut writer = LineWrapWriter::new(writer);
        let empty = Attributes::new();
        write_section(&mut writer, name, self.section(name).unwrap_or(&empty))?;
        writer.flush()
    }

    /// Convenience wrapper around [`Manifest::write_to()`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = vec![];
        self.write_to(&mut buffer).expect("writing to a Vec can't fail");
        buffer
    }
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;

    const MULTILINE_NAMES: &str = concat!(
        "Manifest-Version: 1.0\r\n",
        "Built-By: Generated-by-ADT\r\n",
        "Created-By: Android Gradle 3.3.2\r\n",
        "\r\n",
        "Name: res/drawable/abc_list_selector_background_transition_holo_dark.x\r\n",
        " ml\r\n",
        "SHA1-Digest: x6OHiSoyMWiuIOgpmUuAh/tRnYM=\r\n",
        "\r\n",
        "Name: res/drawable/abc_list_selector_background_transition_holo_light.\r\n",
        " xml\r\n",
        "SHA1-Digest: 0fvC1p6NZOpNNtjO4w0DBYRz8d0=\r\n",
        "\r\n",
    );

    fn multiline_names() -> Manifest {
        let mut manifest = Manifest::with_main(Attributes::from([
            "Manifest-Version: 1.0",
            "Built-By: Generated-by-ADT",
            "Created-By: Android Gradle 3.3.2",
        ]));
        manifest.insert(
            "res/drawable/abc_list_selector_background_transition_holo_light.xml",
            Attributes::from(["SHA1-Digest: 0fvC1p6NZOpNNtjO4w0DBYRz8d0="]),
        );
        manifest.insert(
            "res/drawable/abc_list_selector_background_transition_holo_dark.xml",
            Attributes::from(["SHA1-Digest: x6OHiSoyMWiuIOgpmUuAh/tRnYM="]),
        );
        manifest
    }

    fn to_string(manifest: &Manifest) -> String {
        String::from_utf8(manifest.to_bytes()).unwrap()
    }

    #[test]
    fn test_write_multiline_names() {
        assert_eq!(to_string(&multiline_names()), MULTILINE_NAMES);
    }

    #[test]
    fn test_parse_multiline_names() {
        assert_eq!(
            Manifest::parse(MULTILINE_NAMES.as_bytes()).unwrap(),
            multiline_names()
        );
    }

    #[test]
    fn test_round_trip() {
        let mut manifest = Manifest::with_main(Attributes::from([
            "Manifest-Version: 1.0".to_string(),
            format!("X-Long: {}", "v".repeat(300)),
        ]));
        manifest.insert(
            format!("assets/{}.png", "deep/".repeat(40)),
            Attributes::from(["X-Custom: 1", "SHA1-Digest: waSWLCdh0QfgCEfQJKyhhqZNcx4="]),
        );
        manifest.insert("a", Attributes::from(["SHA1-Digest: abc"]));

        let bytes = manifest.to_bytes();
        assert_eq!(Manifest::parse(bytes.as_slice()).unwrap(), manifest);
    }

    #[test]
    fn test_round_trip_multibyte() {
        let mut split_characters = false;

        // the padding moves the characters to odd and even offsets of the first line and of the
        // continuation lines
        for padding in 0..4 {
            let pad = "a".repeat(padding);
            let mut manifest = Manifest::with_main(Attributes::from([format!(
                "X-Title: {pad}{}",
                "€".repeat(50)
            )]));
            manifest.insert(
                format!("res/raw/{pad}{}.txt", "é".repeat(80)),
                Attributes::from([format!("X-Note: {pad}{}", "ü".repeat(80))]),
            );

            let bytes = manifest.to_bytes();
            split_characters |= std::str::from_utf8(&bytes).is_err();
            assert_eq!(
                Manifest::parse(bytes.as_slice()).unwrap(),
                manifest,
                "padding {padding}"
            );
        }

        assert!(split_characters);
    }

    #[test]
    fn test_empty_sections_are_skipped() {
        let mut manifest = Manifest::with_main(Attributes::from(["Manifest-Version: 1.0"]));
        manifest.insert("empty", Attributes::new());
        manifest.insert("full", Attributes::from(["X: 1"]));

        assert_eq!(
            to_string(&manifest),
            "Manifest-Version: 1.0\r\n\r\nName: full\r\nX: 1\r\n\r\n"
        );
    }

    #[test]
    fn test_main_only() {
        let manifest = Manifest::with_main(Attributes::from(["Manifest-Version: 1.0"]));
        assert_eq!(to_string(&manifest), "Manifest-Version: 1.0\r\n\r\n");

        // no main section at all
        let mut manifest = Manifest::new();
        manifest.insert("a", Attributes::from(["X: 1"]));
        assert_eq!(to_string(&manifest), "\r\nName: a\r\nX: 1\r\n\r\n");
    }

    #[test]
    fn test_write_entry() {
        let manifest = multiline_names();
        let mut output = vec![];
        manifest
            .write_entry(
                &mut output,
                "res/drawable/abc_list_selector_background_transition_holo_dark.xml",
            )
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            concat!(
                "Name: res/drawable/abc_list_selector_background_transition_holo_dark.x\r\n",
                " ml\r\n",
                "SHA1-Digest: x6OHiSoyMWiuIOgpmUuAh/tRnYM=\r\n",
            )
        );
    }
}
