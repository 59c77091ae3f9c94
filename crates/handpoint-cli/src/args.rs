//! CLI argument parsing with clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use handpoint_core::config::TrackerConfig;

/// Hand-landmark pointer tracking.
///
/// Maps hand landmarks to a screen pointer, dwells over interactive elements
/// and activates them. The replay command drives a full tracking session from
/// recorded detector output against a scene layout.
#[derive(Debug, Parser)]
#[command(name = "handpoint", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay recorded detector output against a scene
    #[command(after_help = "\
FRAMES is a JSON-lines file with one detector result per line:
  {\"hands\": [[{\"x\": 0.9, \"y\": 0.1, \"z\": 0.0}, ...21 landmarks]]}
MediaPipe field names (multiHandLandmarks) are accepted too.

Examples:
  handpoint replay frames.jsonl --scene page.json
  handpoint replay frames.jsonl --scene page.json --hover-delay 500
  handpoint replay frames.jsonl --scene page.json --landmark 8 --fps 60
  RUST_LOG=debug handpoint replay frames.jsonl --scene page.json")]
    Replay(ReplayArgs),

    /// Map a normalized landmark position to screen pixels
    #[command(
        allow_negative_numbers = true,
        after_help = "\
Examples:
  handpoint map 0.5 0.5                     # Center of a 1920x1080 screen
  handpoint map 0.9 0.1 --width 1000 --height 1000
  handpoint map 0.6 0.5 --sensitivity-x 2   # Amplified horizontal motion"
    )]
    Map(MapArgs),

    /// Print the effective configuration
    #[command(after_help = "\
Config file lookup:
  1. --config FILE
  2. HANDPOINT_CONFIG
  3. $XDG_CONFIG_HOME/handpoint/<profile>.json
  4. <platform config dir>/handpoint/<profile>.json
Profile comes from HANDPOINT_PROFILE (default: default).

Examples:
  handpoint config
  handpoint config --config kiosk.json --hover-delay 1200")]
    Config(ConfigArgs),

    /// Show an end-to-end usage example
    Examples,
}

/// Config file selection plus per-field overrides.
#[derive(Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// Config file (overrides HANDPOINT_CONFIG and profile lookup)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dwell time before activation
    #[arg(long, value_name = "MS")]
    pub hover_delay: Option<u64>,

    /// Horizontal sensitivity
    #[arg(long, value_name = "F")]
    pub sensitivity_x: Option<f32>,

    /// Vertical sensitivity
    #[arg(long, value_name = "F")]
    pub sensitivity_y: Option<f32>,

    /// Landmark that drives the pointer (0-20; 8 = index fingertip)
    #[arg(long, value_name = "N")]
    pub landmark: Option<u8>,

    /// Pointer image URL
    #[arg(long, value_name = "URL")]
    pub cursor_image: Option<String>,

    /// Show the diagnostic overlay
    #[arg(long, conflicts_with = "no_debug")]
    pub debug: bool,

    /// Hide the diagnostic overlay even if the config file enables it
    #[arg(long)]
    pub no_debug: bool,
}

impl ConfigArgs {
    /// Overlay command-line values on a loaded config.
    pub fn apply(&self, config: &mut TrackerConfig) {
        if let Some(delay) = self.hover_delay {
            config.hover_delay_ms = delay;
        }
        if let Some(x) = self.sensitivity_x {
            config.sensitivity_x = x;
        }
        if let Some(y) = self.sensitivity_y {
            config.sensitivity_y = y;
        }
        if let Some(index) = self.landmark {
            config.cursor_landmark_index = index;
        }
        if let Some(url) = &self.cursor_image {
            config.cursor_image_url = Some(url.clone());
        }
        if self.debug {
            config.debug = true;
        }
        if self.no_debug {
            config.debug = false;
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ReplayArgs {
    /// JSON-lines file of detector results
    pub frames: PathBuf,

    /// Scene layout JSON
    #[arg(long, value_name = "FILE")]
    pub scene: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Frames per second to feed
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Keep tracking this long after the last frame
    #[arg(long, default_value_t = 250, value_name = "MS")]
    pub linger: u64,
}

#[derive(Debug, clap::Args)]
pub struct MapArgs {
    /// Normalized x (0 = left edge of the camera image)
    pub x: f32,

    /// Normalized y (0 = top edge of the camera image)
    pub y: f32,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1920.0)]
    pub width: f32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 1080.0)]
    pub height: f32,

    #[arg(long, default_value_t = 1.0, value_name = "F")]
    pub sensitivity_x: f32,

    #[arg(long, default_value_t = 1.0, value_name = "F")]
    pub sensitivity_y: f32,
}

pub const EXAMPLES_TEXT: &str = r#"End-to-end example: dwell-click a button from a recording

# 1. Describe the page: one hoverable button near the top-left corner
cat > page.json <<'EOF'
{
  "viewport": { "width": 1000, "height": 1000 },
  "elements": [
    { "name": "Btn", "bounds": { "x": 80, "y": 80, "width": 40, "height": 40 },
      "hoverable": true }
  ]
}
EOF

# 2. Check where a landmark lands (the camera image is mirrored)
handpoint map 0.9 0.1 --width 1000 --height 1000
# {"x":100.0,"y":100.0}

# 3. Record (or synthesize) detector output: 20 frames over the button
HAND=$(python3 -c 'import json; print(json.dumps({"hands": [[{"x": 0.9, "y": 0.1}] * 21]}))')
for i in $(seq 20); do echo "$HAND"; done > frames.jsonl

# 4. Replay at 30fps with a 500ms dwell
handpoint replay frames.jsonl --scene page.json --hover-delay 500

# Output: one line per activation, then a summary
# {"type":"activation","element":1,"name":"Btn","at":"..."}
# {"type":"summary","session":"...","frames":20,"activations":1,...}
"#;

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;
    use handpoint_core::config::TrackerConfig;

    #[test]
    fn test_replay_parses_overrides() {
        let cli = Cli::parse_from([
            "handpoint",
            "replay",
            "frames.jsonl",
            "--scene",
            "page.json",
            "--hover-delay",
            "500",
            "--landmark",
            "8",
            "--debug",
        ]);

        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.frames.to_str(), Some("frames.jsonl"));
                assert_eq!(args.fps, 30);

                let mut config = TrackerConfig::default();
                args.config.apply(&mut config);
                assert_eq!(config.hover_delay_ms, 500);
                assert_eq!(config.cursor_landmark_index, 8);
                assert!(config.debug);
                assert_eq!(config.sensitivity_x, 1.0);
            }
            _ => panic!("Expected replay command"),
        }
    }

    #[test]
    fn test_no_debug_overrides_config_file() {
        let cli = Cli::parse_from(["handpoint", "config", "--no-debug"]);

        match cli.command {
            Commands::Config(args) => {
                let mut config = TrackerConfig {
                    debug: true,
                    ..TrackerConfig::default()
                };
                args.apply(&mut config);
                assert!(!config.debug);
            }
            _ => panic!("Expected config command"),
        }
    }

    #[test]
    fn test_debug_and_no_debug_conflict() {
        let result = Cli::try_parse_from(["handpoint", "config", "--debug", "--no-debug"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_map_accepts_negative_coordinates() {
        let cli = Cli::parse_from(["handpoint", "map", "-0.2", "1.3"]);

        match cli.command {
            Commands::Map(args) => {
                assert_eq!(args.x, -0.2);
                assert_eq!(args.y, 1.3);
                assert_eq!(args.width, 1920.0);
            }
            _ => panic!("Expected map command"),
        }
    }

    #[test]
    fn test_replay_requires_scene() {
        let result = Cli::try_parse_from(["handpoint", "replay", "frames.jsonl"]);
        assert!(result.is_err());
    }
}
