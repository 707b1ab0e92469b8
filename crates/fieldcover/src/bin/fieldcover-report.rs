//! Demo driver: verifies a representative number-format property bag and
//! prints the JSON coverage report.

use chrono::Utc;
use fieldcover::{
    CoverageHarness, FieldBinding, PropertyBag, SampleValue, TAG_BOOL, TAG_DECIMAL, TAG_INT,
    TAG_TEXT,
};

const PAD_POSITION_LABELS: &[&str] = &["before_prefix", "after_prefix", "before_suffix", "after_suffix"];

/// Position of padding relative to the formatted number's affixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PadPosition {
    BeforePrefix,
    AfterPrefix,
    BeforeSuffix,
    AfterSuffix,
}

impl PadPosition {
    fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::BeforePrefix),
            1 => Some(Self::AfterPrefix),
            2 => Some(Self::BeforeSuffix),
            3 => Some(Self::AfterSuffix),
            _ => None,
        }
    }

    fn ordinal(self) -> u32 {
        match self {
            Self::BeforePrefix => 0,
            Self::AfterPrefix => 1,
            Self::BeforeSuffix => 2,
            Self::AfterSuffix => 3,
        }
    }

    fn label(self) -> &'static str {
        PAD_POSITION_LABELS[self.ordinal() as usize]
    }
}

/// A compact number-format settings bag: the kind of object the harness
/// exists to check.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
struct FormatProperties {
    format_width: i64,
    grouping_used: bool,
    positive_prefix: Option<String>,
    rounding_increment: Option<i64>,
    pad_position: Option<PadPosition>,
}

impl FormatProperties {
    fn set_format_width(&mut self, width: i64) -> &mut Self {
        self.format_width = width;
        self
    }

    fn set_grouping_used(&mut self, used: bool) -> &mut Self {
        self.grouping_used = used;
        self
    }

    fn set_positive_prefix(&mut self, prefix: Option<&str>) -> &mut Self {
        self.positive_prefix = prefix.map(str::to_string);
        self
    }

    fn set_rounding_increment(&mut self, increment: Option<i64>) -> &mut Self {
        self.rounding_increment = increment;
        self
    }

    fn set_pad_position(&mut self, position: Option<PadPosition>) -> &mut Self {
        self.pad_position = position;
        self
    }
}

impl PropertyBag for FormatProperties {
    const TYPE_NAME: &'static str = "FormatProperties";

    fn copy_from(&mut self, other: &Self) -> &mut Self {
        *self = other.clone();
        self
    }

    fn clear(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    fn bindings() -> Vec<FieldBinding<Self>> {
        vec![
            FieldBinding {
                name: "format_width",
                type_tag: TAG_INT,
                get: |bag| SampleValue::Int(bag.format_width),
                set: |bag, value| {
                    bag.set_format_width(value.as_int()?);
                    Ok(())
                },
            },
            FieldBinding {
                name: "grouping_used",
                type_tag: TAG_BOOL,
                get: |bag| SampleValue::Bool(bag.grouping_used),
                set: |bag, value| {
                    bag.set_grouping_used(value.as_bool()?);
                    Ok(())
                },
            },
            FieldBinding {
                name: "positive_prefix",
                type_tag: TAG_TEXT,
                get: |bag| match &bag.positive_prefix {
                    None => SampleValue::Absent,
                    Some(prefix) => SampleValue::Text(prefix.clone()),
                },
                set: |bag, value| {
                    bag.set_positive_prefix(value.as_text()?);
                    Ok(())
                },
            },
            FieldBinding {
                name: "rounding_increment",
                type_tag: TAG_DECIMAL,
                get: |bag| match bag.rounding_increment {
                    None => SampleValue::Absent,
                    Some(increment) => SampleValue::Decimal(increment),
                },
                set: |bag, value| {
                    bag.set_rounding_increment(value.as_decimal()?);
                    Ok(())
                },
            },
            FieldBinding {
                name: "pad_position",
                type_tag: "pad-position",
                get: |bag| match bag.pad_position {
                    None => SampleValue::Absent,
                    Some(position) => SampleValue::Enum {
                        type_tag: "pad-position".to_string(),
                        ordinal: position.ordinal(),
                        label: position.label().to_string(),
                    },
                },
                set: |bag, value| {
                    let position = value
                        .as_enum_ordinal()?
                        .and_then(PadPosition::from_ordinal);
                    bag.set_pad_position(position);
                    Ok(())
                },
            },
        ]
    }
}

fn main() {
    let exit_code = match run(std::env::args().skip(1).collect()) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error}");
            2
        }
    };
    std::process::exit(exit_code);
}

fn run(args: Vec<String>) -> Result<i32, String> {
    let mut pretty = false;
    for arg in &args {
        match arg.as_str() {
            "--pretty" => pretty = true,
            "help" | "--help" | "-h" => {
                println!("{}", usage());
                return Ok(0);
            }
            other => return Err(format!("unknown argument '{other}'\n\n{}", usage())),
        }
    }

    let mut harness = CoverageHarness::with_builtins();
    harness
        .registry_mut()
        .register_enumerated("pad-position", PAD_POSITION_LABELS);

    let report = harness
        .verify::<FormatProperties>(Utc::now())
        .map_err(|error| error.to_string())?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(|error| format!("could not serialize report: {error}"))?;
    println!("{json}");

    Ok(if report.passed() { 0 } else { 1 })
}

fn usage() -> String {
    [
        "fieldcover-report usage:",
        "  fieldcover-report [--pretty]",
        "",
        "Runs the field-coverage harness over the demo FormatProperties bag",
        "and prints the JSON coverage report.",
        "",
        "exit codes:",
        "  0   every field and aggregate check passed",
        "  1   at least one coverage check failed",
        "  2   CLI/input error",
    ]
    .join("\n")
}
