//! Whitespace normalization for ffmpeg status lines.
//!
//! ffmpeg pads its stats columns (`frame=   12  size=   400kB`); a run of
//! whitespace collapses to its first character and whitespace right after `=`
//! is dropped, giving `frame=12 size=400kB`.

/// Collapse whitespace runs and remove padding after `=`
pub fn strip_spaces(token: &str) -> String {
    let mut prev: Option<char> = None;
    token
        .chars()
        .filter(|&c| {
            let drop = c.is_whitespace()
                && matches!(prev, Some(p) if p.is_whitespace() || p == '=');
            if !drop {
                prev = Some(c);
            }
            !drop
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_line() {
        assert_eq!(
            strip_spaces("frame=   12  size=   400kB"),
            "frame=12 size=400kB"
        );
    }

    #[test]
    fn test_full_ffmpeg_status() {
        let line = "frame=  240 fps= 60 q=28.0 size=     512kB time=00:00:08.00 bitrate= 524.3kbits/s speed=2.01x    ";
        assert_eq!(
            strip_spaces(line),
            "frame=240 fps=60 q=28.0 size=512kB time=00:00:08.00 bitrate=524.3kbits/s speed=2.01x "
        );
    }

    #[test]
    fn test_keeps_first_whitespace_of_a_run() {
        assert_eq!(strip_spaces("a\t \tb"), "a\tb");
        assert_eq!(strip_spaces("  leading"), " leading");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "frame=   12  size=   400kB",
            " = \t= x",
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':",
            "",
            "==  =",
            "  \u{a0} mixed \u{2003} unicode  ",
        ];
        for sample in samples {
            let once = strip_spaces(sample);
            assert_eq!(strip_spaces(&once), once, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_non_whitespace_untouched() {
        let line = "Error:opening=output,file";
        assert_eq!(strip_spaces(line), line);
    }
}
