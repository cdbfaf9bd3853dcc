//! Integration tests for live playback: compiled timeline → scheduler → sinks.
//!
//! A manual clock stands in for wall time and the audio sink feeds a ring
//! buffer drained by the real mixer callback. No audio hardware required.

use std::sync::Arc;
use std::time::Duration;

use gran_cassa::audio::callback::AudioCallback;
use gran_cassa::audio::{AudioCommand, AudioSink};
use gran_cassa::event::{compile, Millis};
use gran_cassa::instrument::{default_kit, synth, SampleBank, SampleData};
use gran_cassa::model::{Composition, Pattern, SongConfig};
use gran_cassa::playback::{
    Clock, Fired, Hit, ManualClock, PlaybackScheduler, Repeat, StopHandle, Trigger,
};
use ringbuf::traits::Split;
use ringbuf::HeapRb;

const SLICE: Duration = Duration::from_millis(1);

fn four_on_the_floor() -> Composition {
    Composition::new(
        SongConfig::new(130),
        vec![
            Pattern::new(vec![1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0])
                .with_name("kick")
                .with_note(synth::KICK),
            Pattern::new(vec![0, 1, 0, 1])
                .with_name("snare")
                .with_channel(2)
                .with_note(synth::SNARE)
                .with_panning(vec![30, 98]),
            Pattern::new(vec![1; 8])
                .with_name("cowbell")
                .with_channel(3)
                .with_note(56),
        ],
    )
}

/// Counts hits and remembers when each arrived.
struct Log<'a, T: Trigger> {
    clock: &'a ManualClock,
    inner: T,
    at: Vec<(Duration, u8)>,
}

impl<T: Trigger> Trigger for Log<'_, T> {
    fn fire(&mut self, hit: &Hit) -> Fired {
        self.at.push((self.clock.now(), hit.note));
        self.inner.fire(hit)
    }

    fn finish(&mut self) {
        self.inner.finish();
    }
}

#[test]
fn kick_lands_on_quarter_notes_at_130_bpm() {
    let comp = four_on_the_floor();
    let timeline = compile(&comp, &Millis::from(comp.config())).unwrap();
    let clock = ManualClock::new();
    let (prod, _cons) = HeapRb::<AudioCommand>::new(64).split();
    let mut log = Log {
        clock: &clock,
        inner: AudioSink::new(prod, Arc::new(default_kit(44100, 42))),
        at: Vec::new(),
    };

    let mut scheduler = PlaybackScheduler::new(&clock, SLICE, StopHandle::new());
    let report = scheduler.run(&timeline, &mut log, Repeat::Once);

    // Kick and snare are in the default kit; the cowbell is not.
    assert_eq!(report.fired, 6);
    assert_eq!(report.missing, 8);
    assert!(!report.stopped);

    let kick_ms: Vec<f64> = log
        .at
        .iter()
        .filter(|(_, note)| *note == synth::KICK)
        .map(|(at, _)| at.as_secs_f64() * 1000.0)
        .collect();
    for (got, want) in kick_ms.iter().zip([0.0, 461.538, 923.077, 1384.615]) {
        assert!(*got >= want - 1e-3 && *got <= want + 1.0, "{got} vs {want}");
    }

    // One pass lasts a full bar.
    assert!(clock.now() >= Duration::from_micros(1_846_153));
}

#[test]
fn mixer_hears_panned_snare() {
    let comp = four_on_the_floor();
    let timeline = compile(&comp, &Millis::from(comp.config())).unwrap();
    let clock = ManualClock::new();
    let (prod, cons) = HeapRb::<AudioCommand>::new(64).split();
    let mut mixer = AudioCallback::new(cons, 2);

    let mut bank = SampleBank::new();
    bank.insert(synth::SNARE, SampleData::from_mono(vec![0.5; 8], 44100));
    let mut sink = AudioSink::new(prod, Arc::new(bank));

    let mut scheduler = PlaybackScheduler::new(&clock, SLICE, StopHandle::new());
    let report = scheduler.run(&timeline, &mut sink, Repeat::Once);
    assert_eq!(report.fired, 2);

    // The mixer drains both queued snare voices at once: pan 30 leans left, 98 right.
    let mut out = vec![0.0f32; 2];
    mixer.process(&mut out);
    assert_eq!(mixer.active_voices(), 2);
    let gain = 100.0f32 / 127.0 * 0.5;
    let left = gain + gain * (1.0 - (98.0 - 64.0) / 64.0);
    let right = gain * (1.0 + (30.0 - 64.0) / 64.0) + gain;
    assert!((out[0] - left).abs() < 1e-5, "{} vs {left}", out[0]);
    assert!((out[1] - right).abs() < 1e-5, "{} vs {right}", out[1]);
}

#[test]
fn looped_playback_stops_on_request() {
    let comp = four_on_the_floor();
    let timeline = compile(&comp, &Millis::from(comp.config())).unwrap();
    let clock = ManualClock::new();
    let stop = StopHandle::new();

    struct StopAfter {
        remaining: usize,
        stop: StopHandle,
    }
    impl Trigger for StopAfter {
        fn fire(&mut self, _hit: &Hit) -> Fired {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.stop.stop();
            }
            Fired::Played
        }
    }

    let mut trigger = StopAfter {
        remaining: timeline.len() * 2 + 1,
        stop: stop.clone(),
    };
    let mut scheduler = PlaybackScheduler::new(&clock, SLICE, stop);
    let report = scheduler.run(&timeline, &mut trigger, Repeat::Forever);

    assert!(report.stopped);
    assert_eq!(report.passes, 2);
    // The third pass started right after two full bars.
    let two_bars = 2.0 * 4.0 * 60.0 / 130.0;
    let drift = clock.now().as_secs_f64() - two_bars;
    assert!(drift > -1e-6 && drift <= SLICE.as_secs_f64(), "drift {drift}");
}
