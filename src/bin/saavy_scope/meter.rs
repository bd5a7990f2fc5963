//! Level meter for a scope snapshot

use saavy_scope::SampleBuffer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevel {
    pub peak: f32,
    pub rms: f32,
}

/// Peak and RMS of the first `valid` samples of each channel.
pub fn levels(snapshot: &SampleBuffer, valid: usize) -> Vec<ChannelLevel> {
    snapshot
        .channels()
        .map(|channel| {
            let samples = &channel[..valid.min(channel.len())];
            if samples.is_empty() {
                return ChannelLevel { peak: 0.0, rms: 0.0 };
            }
            let peak = samples.iter().fold(0.0f32, |p, s| p.max(s.abs()));
            let rms = (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
            ChannelLevel { peak, rms }
        })
        .collect()
}

/// `[#####-----]` style bar: `#` up to the RMS, `|` at the peak.
pub fn bar(level: ChannelLevel, width: usize) -> String {
    let fill = |v: f32| ((v.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    let rms = fill(level.rms);
    let peak = fill(level.peak).max(rms);

    let mut out = String::with_capacity(width + 2);
    out.push('[');
    for i in 0..width {
        out.push(if i < rms {
            '#'
        } else if i + 1 == peak {
            '|'
        } else {
            '-'
        });
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_only_look_at_valid_samples() {
        let snapshot = SampleBuffer::from_channels(vec![vec![0.5, -1.0, 0.9, 0.9]]);
        let level = levels(&snapshot, 2)[0];

        assert_eq!(level.peak, 1.0);
        assert!((level.rms - (1.25f32 / 2.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn bar_marks_rms_and_peak() {
        let text = bar(ChannelLevel { peak: 0.8, rms: 0.3 }, 10);
        assert_eq!(text, "[###----|--]");
    }

    #[test]
    fn empty_snapshot_reads_silent() {
        let snapshot = SampleBuffer::new(2, 16);
        assert!(levels(&snapshot, 0).iter().all(|l| l.peak == 0.0));
    }
}
