use anyhow::Context;
use eframe::egui;
use rules_core::{
    Assignment, PickedImage, RowId, Rule, RuleTable, Settings, TableError, TokenKind,
    column_label, display_lines, kind_of_word,
};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const NUMBER_W: f32 = 60.0;
const FILTER_W: f32 = 260.0;
const CELL_W: f32 = 200.0;
const CELL_H: f32 = 160.0;
const HEADER_H: f32 = 28.0;
const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

fn main() -> eframe::Result<()> {
    env_logger::init();

    let (settings, startup_error) = match std::env::args().nth(1) {
        Some(path) => match Settings::load_json_file(&path)
            .with_context(|| format!("load settings file: {path}"))
        {
            Ok(s) => (s, None),
            Err(e) => {
                log::error!("{e:#}");
                (Settings::default(), Some(format!("{e:#}")))
            }
        },
        None => (Settings::default(), None),
    };

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Rules creation",
        options,
        Box::new(move |_cc| Ok(Box::new(RulesApp::new(settings, startup_error)))),
    )
}

/// Gestures collected while drawing, applied once the frame is laid out.
#[derive(Debug, Clone, Copy)]
enum UiAction {
    AddRule,
    DeleteRule(RowId),
    SelectRow(usize),
    AddVariant,
    DeleteVariant(usize),
    SelectColumn(usize),
    Upload(RowId, usize),
    BeginDrag(usize),
    DragOver(usize),
    EndDrag,
}

struct CachedTexture {
    fingerprint: u64,
    texture: Option<egui::TextureHandle>,
}

struct RulesApp {
    table: RuleTable,

    // UI state
    textures: HashMap<(RowId, usize), CachedTexture>,
    seen_columns: usize,
    last_error: Option<String>,
}

impl RulesApp {
    fn new(settings: Settings, startup_error: Option<String>) -> Self {
        let table = RuleTable::new(settings);
        Self {
            seen_columns: table.columns(),
            table,
            textures: HashMap::new(),
            last_error: startup_error,
        }
    }

    fn apply(&mut self, action: UiAction) {
        let res: Result<(), TableError> = match action {
            UiAction::AddRule => {
                self.table.add_row();
                Ok(())
            }
            UiAction::DeleteRule(id) => self.table.remove_row(id),
            UiAction::SelectRow(i) => {
                self.table.select_row(i);
                Ok(())
            }
            UiAction::AddVariant => {
                self.table.add_column();
                Ok(())
            }
            UiAction::DeleteVariant(i) => self.table.remove_column(i),
            UiAction::SelectColumn(i) => {
                self.table.select_column(i);
                Ok(())
            }
            UiAction::Upload(id, col) => {
                let mut source = pick_with_dialog;
                self.table.upload_into(id, col, &mut source).map(|_| ())
            }
            UiAction::BeginDrag(i) => {
                self.table.begin_drag(i);
                Ok(())
            }
            UiAction::DragOver(i) => {
                self.table.mark_drag_target(i);
                Ok(())
            }
            UiAction::EndDrag => {
                self.table.end_drag();
                Ok(())
            }
        };

        match res {
            Ok(()) => self.last_error = None,
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    /// Decode every assigned image once; reload when a cell's payload changes.
    fn sync_textures(&mut self, ctx: &egui::Context) {
        let mut live = Vec::new();

        for rule in self.table.rules() {
            for (col, cell) in rule.variants.iter().enumerate() {
                let Some(assignment) = cell else {
                    continue;
                };
                let key = (rule.id, col);
                live.push(key);

                let fingerprint = fingerprint(assignment);
                if self
                    .textures
                    .get(&key)
                    .is_some_and(|c| c.fingerprint == fingerprint)
                {
                    continue;
                }

                let texture = match decode_image(assignment) {
                    Ok(img) => Some(ctx.load_texture(
                        format!("cell:{}:{}", rule.id, col),
                        img,
                        egui::TextureOptions::LINEAR,
                    )),
                    Err(e) => {
                        log::warn!("cannot show '{}': {e:#}", assignment.title);
                        self.last_error = Some(format!("{e:#}"));
                        None
                    }
                };
                self.textures.insert(
                    key,
                    CachedTexture {
                        fingerprint,
                        texture,
                    },
                );
            }
        }

        self.textures.retain(|k, _| live.contains(k));
    }

    fn header_row(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let scroll_to_end = self.seen_columns != self.table.columns();

        ui.horizontal(|ui| {
            fixed(ui, NUMBER_W, HEADER_H, |_| {});
            fixed(ui, FILTER_W, HEADER_H, |ui| {
                ui.strong("Product Filter");
            });

            for col in 0..self.table.columns() {
                let selected = self.table.selected_column() == Some(col);
                fixed(ui, CELL_W, HEADER_H, |ui| {
                    if ui.selectable_label(selected, column_label(col)).clicked() {
                        actions.push(UiAction::SelectColumn(col));
                    }
                    if selected && col > 0 && ui.small_button("Delete").clicked() {
                        actions.push(UiAction::DeleteVariant(col));
                    }
                });
            }

            let add = ui.button("+ Add variant");
            if add.clicked() {
                actions.push(UiAction::AddVariant);
            }
            if scroll_to_end {
                add.scroll_to_me(Some(egui::Align::Max));
            }
        });
    }

    fn rule_row(
        &self,
        ui: &mut egui::Ui,
        pos: usize,
        rule: &Rule,
        actions: &mut Vec<UiAction>,
    ) -> egui::Rect {
        let selected = self.table.selected_row() == Some(pos);

        ui.horizontal(|ui| {
            fixed(ui, NUMBER_W, CELL_H, |ui| {
                ui.vertical_centered(|ui| {
                    let handle = ui.add(
                        egui::Label::new(
                            egui::RichText::new(format!("{}", pos + 1))
                                .heading()
                                .strong(),
                        )
                        .sense(egui::Sense::click_and_drag()),
                    );
                    let handle = handle.on_hover_cursor(egui::CursorIcon::Grab);
                    if handle.clicked() {
                        actions.push(UiAction::SelectRow(pos));
                    }
                    if handle.drag_started() {
                        actions.push(UiAction::BeginDrag(pos));
                    }
                    if handle.drag_stopped() {
                        actions.push(UiAction::EndDrag);
                    }
                    if selected && ui.small_button("Delete").clicked() {
                        actions.push(UiAction::DeleteRule(rule.id));
                    }
                });
            });

            fixed(ui, FILTER_W, CELL_H, |ui| {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.set_min_size(egui::vec2(FILTER_W - 12.0, CELL_H - 12.0));
                    for line in display_lines(&rule.filter) {
                        ui.horizontal_wrapped(|ui| {
                            for word in line.split(' ') {
                                ui.label(
                                    egui::RichText::new(word)
                                        .small()
                                        .color(word_color(kind_of_word(&rule.filter, word))),
                                );
                            }
                        });
                    }
                });
            });

            for (col, cell) in rule.variants.iter().enumerate() {
                fixed(ui, CELL_W, CELL_H, |ui| {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_min_size(egui::vec2(CELL_W - 12.0, CELL_H - 12.0));
                        ui.vertical_centered(|ui| match cell {
                            Some(assignment) => {
                                let tex = self
                                    .textures
                                    .get(&(rule.id, col))
                                    .and_then(|c| c.texture.as_ref());
                                if let Some(tex) = tex {
                                    let size = fit(tex.size_vec2(), CELL_W - 24.0, CELL_H - 60.0);
                                    ui.image((tex.id(), size));
                                }
                                ui.label(egui::RichText::new(&assignment.title).small());
                                if ui.small_button("Replace").clicked() {
                                    actions.push(UiAction::Upload(rule.id, col));
                                }
                            }
                            None => {
                                ui.add_space(CELL_H / 2.0 - 30.0);
                                if ui.button("Add design").clicked() {
                                    actions.push(UiAction::Upload(rule.id, col));
                                }
                            }
                        });
                    });
                });
            }
        })
        .response
        .rect
    }

    /// While a row is being dragged, the row under the pointer is the target.
    fn track_drag(&self, ui: &egui::Ui, rects: &[egui::Rect], actions: &mut Vec<UiAction>) {
        if !self.table.drag_state().is_active() {
            return;
        }

        if let Some(p) = ui.ctx().input(|i| i.pointer.hover_pos()) {
            if let Some(target) = rects.iter().position(|r| r.contains(p)) {
                actions.push(UiAction::DragOver(target));
            }
        }

        let stroke = egui::Stroke::new(2.0, egui::Color32::from_rgb(34, 160, 90));
        if let Some(rect) = self.table.drag_state().target().and_then(|t| rects.get(t)) {
            ui.painter().rect_stroke(*rect, 6.0, stroke);
        }
    }
}

impl eframe::App for RulesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_textures(ctx);
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Rules creation");
                ui.separator();
                ui.label(format!(
                    "{} rules | {} variants",
                    self.table.rules().len(),
                    self.table.columns()
                ));
            });

            if let Some(err) = &self.last_error {
                ui.colored_label(egui::Color32::RED, format!("Error: {err}"));
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                self.header_row(ui, &mut actions);
                ui.separator();

                let rects: Vec<egui::Rect> = self
                    .table
                    .rules()
                    .iter()
                    .enumerate()
                    .map(|(pos, rule)| self.rule_row(ui, pos, rule, &mut actions))
                    .collect();
                self.track_drag(ui, &rects, &mut actions);

                ui.add_space(8.0);
                if ui.button("+ Add rule").clicked() {
                    actions.push(UiAction::AddRule);
                }
            });
        });

        self.seen_columns = self.table.columns();

        // A drag released outside any handle still has to finish.
        if self.table.drag_state().is_active() && ctx.input(|i| i.pointer.any_released()) {
            actions.push(UiAction::EndDrag);
        }

        let mut ended = false;
        for action in actions {
            if matches!(action, UiAction::EndDrag) {
                if ended {
                    continue;
                }
                ended = true;
            }
            self.apply(action);
        }
    }
}

/// Lays out `add` in a box of exactly `w` by at least `h`.
fn fixed(ui: &mut egui::Ui, w: f32, h: f32, add: impl FnOnce(&mut egui::Ui)) {
    ui.allocate_ui_with_layout(
        egui::vec2(w, h),
        egui::Layout::left_to_right(egui::Align::Center),
        |ui| {
            ui.set_min_size(egui::vec2(w, h));
            ui.set_max_width(w);
            add(ui);
        },
    );
}

fn fit(size: egui::Vec2, max_w: f32, max_h: f32) -> egui::Vec2 {
    if size.x <= 0.0 || size.y <= 0.0 {
        return egui::vec2(max_w, max_h);
    }
    let scale = (max_w / size.x).min(max_h / size.y).min(1.0);
    size * scale
}

fn word_color(kind: Option<TokenKind>) -> egui::Color32 {
    match kind {
        Some(TokenKind::Condition) => egui::Color32::from_rgb(30, 64, 175),
        Some(TokenKind::Operator) => egui::Color32::from_rgb(22, 101, 52),
        _ => egui::Color32::from_rgb(133, 77, 14),
    }
}

fn fingerprint(a: &Assignment) -> u64 {
    let mut h = DefaultHasher::new();
    a.image.hash(&mut h);
    h.finish()
}

fn decode_image(a: &Assignment) -> anyhow::Result<egui::ColorImage> {
    let bytes = a.payload_bytes().context("read image payload")?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("decode image '{}'", a.title))?
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        size,
        img.as_flat_samples().as_slice(),
    ))
}

fn pick_with_dialog() -> Option<PickedImage> {
    let path = rfd::FileDialog::new()
        .set_title("Choose a design")
        .add_filter("Images", IMAGE_EXTS)
        .pick_file()?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    match std::fs::read(&path) {
        Ok(bytes) => Some(PickedImage::new(name, bytes)),
        Err(e) => {
            log::error!("read {}: {e}", path.display());
            None
        }
    }
}
