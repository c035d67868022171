use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::model::station_label;
use crate::state::{AppState, Session, Status};
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Configurações");
    ui.separator();

    if state.session.is_none() {
        ui.label("Por favor, abra um arquivo com os dados de qualidade da água.");
        if ui.button("Abrir…").clicked() {
            open_file_dialog(state);
        }
        return;
    }
    let Some(session) = state.session.as_mut() else {
        return;
    };

    // ---- Date interval ----
    ui.strong("Selecione o período");
    let interval = session.selections.filters.interval;
    let mut start = interval.start();
    let mut end = interval.end();
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("De");
        changed |= ui
            .add(DatePickerButton::new(&mut start).id_salt("period_start"))
            .changed();
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Até");
        changed |= ui
            .add(DatePickerButton::new(&mut end).id_salt("period_end"))
            .changed();
    });
    if changed {
        session.set_interval(start, end);
    }
    ui.label(
        RichText::new(format!(
            "Dados de {} a {}",
            session.bounds.start(),
            session.bounds.end()
        ))
        .small(),
    );
    ui.separator();

    // ---- Station selection ----
    let options = session.station_options.clone();
    let n_selected = options
        .iter()
        .filter(|s| session.selections.filters.stations.contains(*s))
        .count();
    let header_text = format!("Estações  ({n_selected}/{})", options.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("stations")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("Todas").clicked() {
                    session.select_all_stations();
                }
                if ui.small_button("Nenhuma").clicked() {
                    session.select_no_stations();
                }
            });

            ScrollArea::vertical()
                .max_height(320.0)
                .auto_shrink([false, true])
                .show(ui, |ui: &mut Ui| {
                    for station in &options {
                        let mut checked = session.selections.filters.stations.contains(station);
                        let text = RichText::new(station_label(station))
                            .color(session.station_colors.color_for(station));
                        if ui.checkbox(&mut checked, text).changed() {
                            session.toggle_station(station);
                        }
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Fechar").clicked() {
                state.clear();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &state.session {
            ui.label(format!(
                "{}: {} leituras, {} no filtro",
                session
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                session.table.len(),
                session.evaluation.filtered.len()
            ));
        }

        if let Some(status) = &state.status_message {
            ui.separator();
            let color = match status {
                Status::Success(_) => Color32::GREEN,
                Status::Error(_) => Color32::RED,
            };
            ui.label(RichText::new(status.text()).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – preview and charts
// ---------------------------------------------------------------------------

/// Render every section of the dashboard for the current evaluation.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    let preview_rows = state.settings.preview_rows;
    let Some(session) = state.session.as_mut() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Análise de Qualidade da Água  (Arquivo → Abrir…)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Prévia dos Dados");
            preview_table(ui, session, preview_rows);
            ui.add_space(12.0);

            ui.heading("Mapa de Localização das Estações");
            plot::station_map(ui, session);
            ui.add_space(12.0);

            bar_section(ui, session);
            ui.add_space(12.0);

            scatter_section(ui, session);
        });
}

fn preview_table(ui: &mut Ui, session: &Session, max_rows: usize) {
    let table = &session.table;
    ScrollArea::horizontal()
        .id_salt("preview_scroll")
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("preview")
                .striped(true)
                .show(ui, |ui: &mut Ui| {
                    for col in &table.column_names {
                        ui.strong(col);
                    }
                    ui.end_row();
                    for &row in session.evaluation.filtered.iter().take(max_rows) {
                        for col in &table.column_names {
                            ui.label(table.display_cell(row, col));
                        }
                        ui.end_row();
                    }
                });
        });
}

/// Combo box over `options`; returns the newly picked option, if any.
fn parameter_combo(
    ui: &mut Ui,
    id: &str,
    label: &str,
    current: Option<&str>,
    options: &[String],
) -> Option<String> {
    let mut picked = None;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(current.unwrap_or("—"))
            .show_ui(ui, |ui: &mut Ui| {
                for option in options {
                    if ui
                        .selectable_label(current == Some(option.as_str()), option)
                        .clicked()
                    {
                        picked = Some(option.clone());
                    }
                }
            });
    });
    picked.filter(|p| Some(p.as_str()) != current)
}

fn bar_section(ui: &mut Ui, session: &mut Session) {
    let year_column = session.table.columns.year.clone();
    if !session.table.has_column(&year_column) {
        return;
    }
    ui.heading(format!("Gráfico de Barras: {year_column} vs Parâmetro"));

    let parameters = session.evaluation.parameters.clone();
    if let Some(p) = parameter_combo(
        ui,
        "bar_parameter",
        "Escolha um parâmetro para o gráfico de barras",
        session.selections.bar_parameter.as_deref(),
        &parameters,
    ) {
        session.set_bar_parameter(p);
    }

    if let Some(series) = &session.evaluation.bar {
        plot::yearly_bar_chart(ui, series, &year_column);
    }
}

fn scatter_section(ui: &mut Ui, session: &mut Session) {
    let parameters = session.evaluation.parameters.clone();
    if parameters.len() >= 2 {
        ui.heading("Gráfico de Dispersão");
        let x_pick = parameter_combo(
            ui,
            "x_axis",
            "Selecione o eixo X",
            session.selections.x_axis.as_deref(),
            &parameters,
        );
        let y_pick = parameter_combo(
            ui,
            "y_axis",
            "Selecione o eixo Y",
            session.selections.y_axis.as_deref(),
            &parameters,
        );
        if let Some(x) = x_pick {
            session.set_x_axis(x);
        }
        if let Some(y) = y_pick {
            session.set_y_axis(y);
        }
    }

    for warning in &session.evaluation.warnings {
        ui.label(RichText::new(warning.to_string()).color(Color32::YELLOW));
    }

    if let Some(scatter) = &session.evaluation.scatter {
        plot::scatter_plot(ui, scatter, &session.station_colors);
    }

    if let Some(corr) = &session.evaluation.correlation {
        ui.heading("Coeficiente de Correlação de Spearman");
        ui.label(RichText::new(corr.display()).strong().size(20.0));
        if let Some(p) = corr.p_value {
            ui.label(RichText::new(format!("p = {p:.4}  (n = {})", corr.n)).small());
        }
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Abrir dados de qualidade da água")
        .add_filter(
            "Arquivos suportados",
            &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv", "json", "parquet", "pq"],
        )
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls"])
        .add_filter("OpenDocument", &["ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.load(path);
    }
}
