mod render_util;

use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use gpui::{
    App, Bounds, Context, FocusHandle, KeyDownEvent, RenderImage, SharedString, TitlebarOptions,
    Window, WindowBounds, WindowOptions, div, img, prelude::*, px, size,
};
use gpui_component::{ActiveTheme, h_flex, v_flex};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{pipeline::CompositedFrame, session::Command};

const SIDE_PANEL_WIDTH: f32 = 300.0;

pub fn launch_ui(
    app: &mut App,
    frames: Receiver<CompositedFrame>,
    commands: Sender<Command>,
) -> Result<()> {
    let bounds = Bounds::centered(None, size(px(1280.0 + SIDE_PANEL_WIDTH), px(760.0)), app);
    let options = WindowOptions {
        window_bounds: Some(WindowBounds::Windowed(bounds)),
        titlebar: Some(TitlebarOptions {
            title: Some("Finger Calculator".into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(options, |window, cx| {
        let view = cx.new(|cx| CalculatorView::new(frames, commands, cx));
        view.read(cx).focus_handle.focus(window);
        view
    })?;
    app.on_window_closed(|cx| cx.quit()).detach();
    app.activate(true);

    Ok(())
}

struct CalculatorView {
    frames: Receiver<CompositedFrame>,
    commands: Sender<Command>,
    focus_handle: FocusHandle,
    image: Option<Arc<RenderImage>>,
    lines: Vec<SharedString>,
}

impl CalculatorView {
    fn new(
        frames: Receiver<CompositedFrame>,
        commands: Sender<Command>,
        cx: &mut Context<Self>,
    ) -> Self {
        Self {
            frames,
            commands,
            focus_handle: cx.focus_handle(),
            image: None,
            lines: Vec::new(),
        }
    }

    /// Takes the newest composited frame. Returns false once the frame loop
    /// has finished and dropped its end of the channel.
    fn pull_latest(&mut self, window: &mut Window) -> bool {
        let mut latest = None;
        let alive = loop {
            match self.frames.try_recv() {
                Ok(packet) => latest = Some(packet),
                Err(TryRecvError::Empty) => break true,
                Err(TryRecvError::Disconnected) => break false,
            }
        };

        if let Some(packet) = latest {
            self.lines = packet
                .report
                .lines()
                .into_iter()
                .map(SharedString::from)
                .collect();
            if let Some(image) = render_util::frame_to_image(&packet.frame) {
                if let Some(old) = self.image.replace(image) {
                    if let Err(err) = window.drop_image(old) {
                        log::debug!("failed to release previous frame: {err:?}");
                    }
                }
            }
        }

        alive
    }

    fn on_key_down(&mut self, event: &KeyDownEvent, _window: &mut Window, _cx: &mut Context<Self>) {
        let command = match event.keystroke.key.to_ascii_lowercase().as_str() {
            "q" => Command::Quit,
            "r" => Command::Reset,
            _ => return,
        };
        // The app quits once the loop has released the camera and hung up.
        if self.commands.send(command).is_err() {
            log::debug!("frame loop already stopped, ignoring {command:?}");
        }
    }
}

impl Render for CalculatorView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if !self.pull_latest(window) {
            cx.quit();
        }
        window.request_animation_frame();

        let theme = cx.theme();
        let (background, foreground, muted, border) = (
            theme.background,
            theme.foreground,
            theme.muted_foreground,
            theme.border,
        );

        let video = match &self.image {
            Some(image) => div().flex_1().h_full().child(img(image.clone()).size_full()),
            None => div()
                .flex_1()
                .h_full()
                .flex()
                .items_center()
                .justify_center()
                .text_color(muted)
                .child("Waiting for camera..."),
        };

        h_flex()
            .size_full()
            .bg(background)
            .text_color(foreground)
            .track_focus(&self.focus_handle)
            .on_key_down(cx.listener(Self::on_key_down))
            .child(video)
            .child(
                v_flex()
                    .w(px(SIDE_PANEL_WIDTH))
                    .h_full()
                    .p_4()
                    .gap_2()
                    .border_l_1()
                    .border_color(border)
                    .children(self.lines.iter().cloned().map(|line| div().child(line))),
            )
    }
}
