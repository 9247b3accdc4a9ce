use crate::config::Variant;

pub fn render_index(variant: Variant) -> String {
    let variant_name = match variant {
        Variant::Matches => "matches",
        Variant::Investments => "investments",
    };
    INDEX_HTML
        .replace("{{WEEK}}", &variant.week().to_string())
        .replace("{{VARIANT}}", variant_name)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Figure Friday - Week {{WEEK}}</title>
  <script src="https://cdn.plot.ly/plotly-2.32.0.min.js"></script>
  <style>
    :root { --bg: #f8f9fb; --ink: #1f2430; --card: #ffffff; --accent: #3b6cf6; }
    body.dark { --bg: #14161c; --ink: #e6e9ef; --card: #1e222b; }
    * { box-sizing: border-box; }
    body { margin: 0; background: var(--bg); color: var(--ink); font-family: system-ui, sans-serif; }
    header { display: flex; justify-content: space-between; align-items: center; padding: 12px 24px; }
    header h1 { margin: 0; font-size: 1.4rem; }
    nav a { margin-right: 16px; color: var(--accent); cursor: pointer; }
    main { padding: 0 24px 24px; display: grid; gap: 16px; }
    .panel { background: var(--card); border-radius: 12px; padding: 16px; }
    .filters { display: grid; gap: 10px; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); }
    .charts { display: grid; gap: 16px; grid-template-columns: 2fr 1fr; }
    .cards { display: flex; flex-wrap: wrap; gap: 16px; }
    .card { background: var(--card); border-radius: 12px; width: 560px; padding: 8px; }
    .card header { padding: 4px; }
    .modal { position: fixed; inset: 0; background: rgba(0, 0, 0, 0.5); display: none; }
    .modal.open { display: grid; place-items: center; }
    .modal .panel { width: min(900px, 95vw); display: grid; gap: 8px; }
    textarea { width: 100%; height: 50vh; font-family: monospace; }
    table { border-collapse: collapse; width: 100%; font-size: 0.85rem; }
    td, th { border-bottom: 1px solid rgba(127, 127, 127, 0.25); padding: 4px 6px; text-align: left; }
    [hidden] { display: none !important; }
  </style>
</head>
<body data-variant="{{VARIANT}}">
  <header>
    <h1>Figure Friday - Week {{WEEK}}</h1>
    <nav><a data-page="viz">Visualizations</a><a data-page="data">Data</a></nav>
    <label><input type="checkbox" id="mode" /> Dark</label>
  </header>

  <main>
    <section id="page-viz">
      <div id="filter-board" hidden>
        <div class="panel filters">
          <label>Attendance min <input type="number" id="range-lo" /></label>
          <label>Attendance max <input type="number" id="range-hi" /></label>
          <label>From <input type="date" id="date-start" /></label>
          <label>To <input type="date" id="date-end" /></label>
          <label>Match tier <select id="tier"></select></label>
          <label>Home teams <select id="home" multiple size="4"></select></label>
          <label>Away teams <select id="away" multiple size="4"></select></label>
        </div>
        <div class="charts">
          <div class="panel" id="primary"></div>
          <div class="panel">
            <div id="secondary" style="height: 240px"></div>
            <div id="extremum" style="height: 160px"></div>
          </div>
        </div>
      </div>

      <div id="card-board" hidden>
        <div class="panel">
          <button id="add-chart">Add Chart</button>
          <button id="load-charts">Load Saved Charts</button>
          <button id="save-charts">Save Chart Layout</button>
        </div>
        <div class="cards" id="grid-charts"></div>
      </div>
    </section>

    <section id="page-data" hidden>
      <div class="panel">
        <label>Quick Filter Text <input id="filter-raw-data" placeholder="Type to filter all data sets" /></label>
      </div>
      <div id="grids"></div>
    </section>
  </main>

  <div class="modal" id="editor-menu">
    <div class="panel">
      <strong>Customizing Charts</strong>
      <textarea id="editor"></textarea>
      <div>
        <button id="reset-editor">Reset</button>
        <button id="save-editor">Save</button>
        <button id="save-close-editor">Save &amp; Close</button>
      </div>
    </div>
  </div>

  <script>
    const variant = document.body.dataset.variant;
    const $ = (id) => document.getElementById(id);
    const editClicks = {};
    const deleteClicks = {};
    let state = null;

    const send = async (event) => {
      const res = await fetch('/api/events', {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify(event)
      });
      if (!res.ok) {
        throw new Error(await res.text());
      }
      state = await res.json();
      render();
    };

    const plot = (id, figure) => {
      if (figure && figure.data) {
        Plotly.react($(id), figure.data, figure.layout || {});
      }
    };

    const renderCards = () => {
      const grid = $('grid-charts');
      grid.innerHTML = '';
      state.cards.cards.forEach((card) => {
        const el = document.createElement('div');
        el.className = 'card';
        el.innerHTML = `<header>${card.title} <button data-edit="${card.id}">Edit</button>
          <button data-delete="${card.id}">X</button></header><div id="card-${card.id}"></div>`;
        grid.appendChild(el);
        plot(`card-${card.id}`, card.figure);
      });
    };

    const render = () => {
      document.body.classList.toggle('dark', state.theme === 'dark');
      $('mode').checked = state.theme === 'dark';
      if (variant === 'matches') {
        plot('primary', state.figures.primary);
        plot('secondary', state.figures.secondary);
        plot('extremum', state.figures.extremum);
      } else {
        renderCards();
        const modal = $('editor-menu');
        const wasOpen = modal.classList.contains('open');
        modal.classList.toggle('open', state.editor.opened);
        if (state.editor.opened && !wasOpen) {
          $('editor').value = JSON.stringify(state.editor.loaded_figure || { data: [], layout: {} }, null, 2);
        }
      }
    };

    const selected = (id) => Array.from($(id).selectedOptions).map((option) => option.value);

    const sendFilters = () => send({
      type: 'filters',
      range: [Number($('range-lo').value), Number($('range-hi').value)],
      date_range: [$('date-start').value, $('date-end').value].filter(Boolean),
      tier: $('tier').value,
      home: selected('home'),
      away: selected('away')
    }).catch(console.error);

    const fillSelect = (id, values) => {
      $(id).innerHTML = values.map((value) => `<option value="${value}">${value}</option>`).join('');
    };

    const setupFilters = async () => {
      $('filter-board').hidden = false;
      const options = await (await fetch('/api/options')).json();
      $('range-lo').value = options.range[0];
      $('range-hi').value = options.range[1];
      $('date-start').value = options.date_range[0];
      $('date-end').value = options.date_range[1];
      fillSelect('tier', options.tiers);
      fillSelect('home', options.home_teams);
      fillSelect('away', options.away_teams);
      ['range-lo', 'range-hi', 'date-start', 'date-end', 'tier', 'home', 'away'].forEach((id) => {
        $(id).addEventListener('change', sendFilters);
      });
    };

    const setupCards = () => {
      $('card-board').hidden = false;
      $('add-chart').addEventListener('click', () => send({ type: 'add_card' }).catch(console.error));
      $('save-charts').addEventListener('click', () => send({ type: 'save_charts' }).catch(console.error));
      $('load-charts').addEventListener('click', () => {
        Object.keys(editClicks).forEach((key) => delete editClicks[key]);
        Object.keys(deleteClicks).forEach((key) => delete deleteClicks[key]);
        send({ type: 'load_charts' }).catch(console.error);
      });
      $('grid-charts').addEventListener('click', (event) => {
        const edit = event.target.dataset.edit;
        const remove = event.target.dataset.delete;
        if (edit) {
          editClicks[edit] = (editClicks[edit] || 0) + 1;
          send({ type: 'edit_card', id: Number(edit), n_clicks: editClicks[edit] }).catch(console.error);
        } else if (remove) {
          deleteClicks[remove] = (deleteClicks[remove] || 0) + 1;
          send({ type: 'remove_card', id: Number(remove), n_clicks: deleteClicks[remove] }).catch(console.error);
        }
      });
      const editedFigure = () => {
        try {
          return JSON.parse($('editor').value);
        } catch (err) {
          console.error(err);
          return null;
        }
      };
      $('reset-editor').addEventListener('click', () => {
        $('editor-menu').classList.remove('open');
        send({ type: 'reset_editor' }).catch(console.error);
      });
      $('save-editor').addEventListener('click', () =>
        send({ type: 'save_editor', figure: editedFigure(), close: false }).catch(console.error));
      $('save-close-editor').addEventListener('click', () =>
        send({ type: 'save_editor', figure: editedFigure(), close: true }).catch(console.error));
    };

    const renderGrids = async () => {
      const grids = await (await fetch('/api/data')).json();
      $('grids').innerHTML = grids.map((grid) => `<h4>${grid.name}</h4><table class="${grid.grid_class}">
        <tr>${grid.columns.map((c) => `<th>${c}</th>`).join('')}</tr>
        ${grid.rows.slice(0, 200).map((row) => `<tr>${grid.columns.map((c) => `<td>${row[c] ?? ''}</td>`).join('')}</tr>`).join('')}
      </table>`).join('');
    };

    document.querySelectorAll('nav a').forEach((link) => link.addEventListener('click', () => {
      $('page-viz').hidden = link.dataset.page !== 'viz';
      $('page-data').hidden = link.dataset.page !== 'data';
      if (link.dataset.page === 'data') {
        renderGrids().catch(console.error);
      }
    }));

    $('filter-raw-data').addEventListener('input', (event) => {
      send({ type: 'quick_filter', text: event.target.value }).then(renderGrids).catch(console.error);
    });

    $('mode').addEventListener('change', (event) => {
      send({ type: 'toggle_theme', dark: event.target.checked }).catch(console.error);
    });

    const prefersDark = window.matchMedia('(prefers-color-scheme: dark)').matches;
    (variant === 'matches' ? setupFilters() : Promise.resolve(setupCards()))
      .then(() => send({ type: 'first_paint', os_prefers_dark: prefersDark }))
      .catch(console.error);
  </script>
</body>
</html>
"#;
