use clap::Parser;
use log::{error, warn};
use nannou::prelude::*;

use ring_visualizer::analysis::{Activation, AudioContext};
use ring_visualizer::audio::{AudioElement, MediaElement, Player, Song};
use ring_visualizer::config::Args;
use ring_visualizer::visual::{FrameQueue, NannouSurface};
use ring_visualizer::visualizer::Visualizer;

const SEEK_STEP_SECS: f32 = 5.0;

struct Model {
    player: Option<Player>, // None when there is no audio output
    visualizer: Visualizer,
    frames: FrameQueue,
    canvas: Draw,
    side: f32,
    title: String,
}

fn main() {
    env_logger::init();
    nannou::app(model).update(update).exit(exit).run();
}

fn model(app: &App) -> Model {
    let args = Args::parse();
    let config = args.visualizer_config();

    app.new_window()
        .size(args.size, args.size)
        .title("ring visualizer")
        .view(view)
        .key_pressed(key_pressed)
        .build()
        .unwrap();

    let activation = Activation::default();
    let queue = args.tracks.iter().cloned().map(Song::from_path).collect();
    let mut player = match AudioElement::open() {
        Ok(element) => Some(Player::new(element, queue, activation.clone())),
        Err(e) => {
            warn!("playback disabled: {e:#}");
            None
        }
    };
    if args.autoplay {
        if let Some(player) = player.as_mut() {
            player.play();
        }
    }

    let visualizer = Visualizer::new(
        &config,
        Box::new(move || AudioContext::open_default(activation.clone())),
    );

    Model {
        player,
        visualizer,
        frames: FrameQueue::new(),
        canvas: Draw::new(),
        side: config.width,
        title: String::new(),
    }
}

fn update(app: &App, model: &mut Model, _update: Update) {
    let Model {
        player,
        visualizer,
        frames,
        canvas,
        side,
        title,
    } = model;

    if let Some(player) = player.as_mut() {
        player.poll();
    }
    let song = player
        .as_ref()
        .and_then(|p| p.current_song())
        .map(|s| s.title.clone());

    let next_title = window_title(player.as_ref());
    if *title != next_title {
        app.main_window().set_title(&next_title);
        *title = next_title;
    }

    let element = player
        .as_mut()
        .map(|p| p.element_mut() as &mut dyn MediaElement);
    visualizer.sync(element, song.as_deref(), frames);

    canvas.reset();
    let mut surface = NannouSurface::new(canvas, *side, *side);
    let now_ms = app.duration.since_start.as_secs_f64() * 1000.0;
    let due = frames.take_due();
    visualizer.frame(due, now_ms, frames, &mut surface);
}

fn view(app: &App, model: &Model, frame: Frame) {
    if let Err(e) = model.canvas.to_frame(app, &frame) {
        error!("failed to draw frame: {e:?}");
    }
}

fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    let Some(player) = model.player.as_mut() else {
        return;
    };
    match key {
        Key::Space => player.toggle_play(),
        Key::N => player.next(),
        Key::P => player.previous(),
        Key::Right => player.seek_by(SEEK_STEP_SECS),
        Key::Left => player.seek_by(-SEEK_STEP_SECS),
        _ => {}
    }
}

fn exit(_app: &App, mut model: Model) {
    model.visualizer.unmount(&mut model.frames);
}

fn window_title(player: Option<&Player>) -> String {
    let Some(player) = player else {
        return "ring visualizer (no audio output)".into();
    };
    let Some(song) = player.current_song() else {
        return "ring visualizer".into();
    };
    let element = player.element();
    let state = if element.is_paused() { "paused" } else { "playing" };
    format!(
        "{} [{}] {} / {}",
        song.title,
        state,
        clock(element.current_time()),
        clock(element.duration())
    )
}

fn clock(secs: f32) -> String {
    let secs = secs.max(0.0) as u32;
    format!("{}:{:02}", secs / 60, secs % 60)
}
