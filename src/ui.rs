use crate::models::{ALL_USERS, DashboardView, SummaryRow};

pub fn render_index(view: &DashboardView) -> String {
    let charts = serde_json::to_string(&view.charts).unwrap_or_else(|_| "[]".to_string());
    INDEX_HTML
        .replace("{{START}}", &escape_html(&view.start_date))
        .replace("{{END}}", &escape_html(&view.end_date))
        .replace("{{USER}}", &escape_html(&view.selected_user))
        .replace("{{USER_OPTIONS}}", &render_user_options(view))
        .replace("{{FETCHED_AT}}", &escape_html(view.fetched_at.as_deref().unwrap_or("never")))
        .replace("{{BANNERS}}", &render_banners(view))
        .replace("{{SUMMARY}}", &render_summary(&view.summary))
        .replace("{{CHARTS_JSON}}", &script_safe(&charts))
}

pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}")
}

pub fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(value) if value.is_finite() => format!("{value:.2}%"),
        _ => "N/A".to_string(),
    }
}

fn render_user_options(view: &DashboardView) -> String {
    let mut html = String::new();
    let fallback = [ALL_USERS.to_string()];
    let options: &[String] = if view.user_options.is_empty() {
        &fallback
    } else {
        &view.user_options
    };
    for option in options {
        let selected = if *option == view.selected_user { " selected" } else { "" };
        let option = escape_html(option);
        html.push_str(&format!(r#"<option value="{option}"{selected}>{option}</option>"#));
    }
    html
}

fn render_banners(view: &DashboardView) -> String {
    let mut html = String::new();
    if let Some(error) = &view.error {
        html.push_str(&format!(
            r#"<div class="banner error" role="alert">{}</div>"#,
            escape_html(error)
        ));
    }
    if let Some(notice) = &view.notice {
        html.push_str(&format!(r#"<div class="banner warning">{}</div>"#, escape_html(notice)));
    }
    html
}

fn render_summary(rows: &[SummaryRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut html = String::from(
        r#"<section class="card"><h2>Time Tracking Summary</h2><table><thead><tr><th>Client Tag</th><th>Billable</th><th>Non Billable</th><th>Total Hours</th><th>Percentage Billable</th></tr></thead><tbody>"#,
    );
    for row in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&row.tag),
            format_hours(row.billable_hours),
            format_hours(row.non_billable_hours),
            format_hours(row.total_hours),
            format_percent(row.percent_billable),
        ));
    }
    html.push_str("</tbody></table></section>");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// JSON embedded in a `<script>` block must not close the tag early.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Client Time Tracking Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      grid-template-columns: minmax(220px, 280px) 1fr;
      gap: 24px;
      padding: 32px 18px 48px;
    }

    aside, main {
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 28px;
    }

    aside {
      align-self: start;
      display: grid;
      gap: 14px;
    }

    main {
      display: grid;
      gap: 24px;
      align-content: start;
      animation: rise 600ms ease;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 3vw, 2.4rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.25rem;
    }

    label {
      display: grid;
      gap: 6px;
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    input, select {
      font: inherit;
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
      background: white;
      color: var(--ink);
      text-transform: none;
      letter-spacing: normal;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 12px 18px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      color: white;
      transition: transform 150ms ease;
    }

    button:active {
      transform: scale(0.98);
    }

    .btn-apply {
      background: var(--accent-2);
    }

    .btn-refresh {
      background: var(--accent);
      width: 100%;
    }

    .subtitle {
      margin: 0;
      color: #5f5c57;
      font-size: 0.9rem;
    }

    .banner {
      border-radius: 16px;
      padding: 14px 18px;
      font-weight: 500;
      word-break: break-word;
    }

    .banner.error {
      background: #fde4df;
      color: #c63b2b;
    }

    .banner.warning {
      background: #fff3d6;
      color: #8a5a00;
    }

    .card {
      background: white;
      border-radius: 20px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th, td {
      text-align: right;
      padding: 8px 10px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
    }

    th:first-child, td:first-child {
      text-align: left;
    }

    th {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.08em;
      color: #8b857d;
    }

    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 16px;
    }

    .charts svg {
      width: 100%;
      display: block;
    }

    .charts text {
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      fill: #5f5c57;
      font-size: 11px;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 760px) {
      body {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
<body>
  <aside>
    <h2>Select Date Range</h2>
    <form id="filters" method="get" action="/">
      <label>Start Date <input type="date" name="start" value="{{START}}" /></label>
      <label>End Date <input type="date" name="end" value="{{END}}" /></label>
      <label>Select User <select name="user" id="user-select">{{USER_OPTIONS}}</select></label>
      <p><button class="btn-apply" type="submit">Apply</button></p>
    </form>
    <form method="post" action="/refresh">
      <input type="hidden" name="start" value="{{START}}" />
      <input type="hidden" name="end" value="{{END}}" />
      <input type="hidden" name="user" value="{{USER}}" />
      <button class="btn-refresh" type="submit">Refresh Data</button>
    </form>
    <p class="subtitle">Last fetched: {{FETCHED_AT}}</p>
  </aside>

  <main>
    <header>
      <h1>Client Time Tracking Dashboard</h1>
      <p class="subtitle">{{START}} to {{END}} &middot; {{USER}}</p>
    </header>
    {{BANNERS}}
    {{SUMMARY}}
    <section class="charts" id="charts"></section>
  </main>

  <script id="chart-data" type="application/json">{{CHARTS_JSON}}</script>
  <script>
    const palette = ['#ff6b4a', '#2f4858', '#f6ae2d', '#33658a', '#86bbd8', '#758e4f', '#c8553d', '#9a8f97', '#588b8b', '#f28f3b', '#4f5d75', '#bfc0c0', '#e07a5f', '#3d405b'];
    const charts = JSON.parse(document.getElementById('chart-data').textContent);
    const container = document.getElementById('charts');

    document.getElementById('user-select').addEventListener('change', () => {
      document.getElementById('filters').submit();
    });

    const esc = (text) => String(text).replace(/[&<>"']/g, (ch) => `&#${ch.charCodeAt(0)};`);
    const hours = (value) => (Math.round(value * 100) / 100).toFixed(2);

    const pie = (chart) => {
      const total = chart.slices.reduce((sum, slice) => sum + Math.max(slice.hours, 0), 0);
      if (total <= 0) {
        return '<text x="50%" y="50%" text-anchor="middle">No hours logged</text>';
      }
      const cx = 110;
      const cy = 110;
      const r = 95;
      let angle = -Math.PI / 2;
      let svg = '';
      chart.slices.forEach((slice, index) => {
        const share = Math.max(slice.hours, 0) / total;
        const color = palette[index % palette.length];
        if (share >= 0.9999) {
          svg += `<circle cx="${cx}" cy="${cy}" r="${r}" fill="${color}" />`;
        } else if (share > 0) {
          const next = angle + share * Math.PI * 2;
          const large = share > 0.5 ? 1 : 0;
          const x1 = cx + r * Math.cos(angle);
          const y1 = cy + r * Math.sin(angle);
          const x2 = cx + r * Math.cos(next);
          const y2 = cy + r * Math.sin(next);
          svg += `<path d="M ${cx} ${cy} L ${x1} ${y1} A ${r} ${r} 0 ${large} 1 ${x2} ${y2} Z" fill="${color}" />`;
          angle = next;
        }
        const y = 20 + index * 18;
        svg += `<rect x="230" y="${y - 10}" width="12" height="12" rx="3" fill="${color}" />`;
        svg += `<text x="248" y="${y}">${esc(slice.label)} (${(share * 100).toFixed(1)}%)</text>`;
      });
      return svg;
    };

    const stackedBar = (chart) => {
      const tags = [...new Set(chart.segments.map((segment) => segment.tag))];
      if (!tags.length) {
        return '<text x="50%" y="50%" text-anchor="middle">No hours logged</text>';
      }
      const colors = { 'Billable': palette[0], 'Non-Billable': palette[1] };
      const totals = tags.map((tag) => chart.segments
        .filter((segment) => segment.tag === tag)
        .reduce((sum, segment) => sum + Math.max(segment.hours, 0), 0));
      const max = Math.max(...totals, 1);
      const width = 420;
      const height = 220;
      const bottom = 190;
      const step = (width - 40) / tags.length;
      let svg = '';
      tags.forEach((tag, index) => {
        let y = bottom;
        const x = 30 + index * step + step * 0.15;
        ['Billable', 'Non-Billable'].forEach((kind) => {
          const segment = chart.segments.find((item) => item.tag === tag && item.billable === kind);
          if (!segment || segment.hours <= 0) {
            return;
          }
          const h = (segment.hours / max) * (bottom - 20);
          y -= h;
          svg += `<rect x="${x}" y="${y}" width="${step * 0.7}" height="${h}" fill="${colors[kind]}"><title>${esc(kind)}: ${hours(segment.hours)} h</title></rect>`;
        });
        svg += `<text x="${x + step * 0.35}" y="${bottom + 14}" text-anchor="middle">${esc(tag)}</text>`;
      });
      svg += `<line x1="20" y1="${bottom}" x2="${width - 10}" y2="${bottom}" stroke="rgba(47,72,88,0.25)" />`;
      svg += `<rect x="${width - 130}" y="4" width="12" height="12" rx="3" fill="${colors['Billable']}" /><text x="${width - 112}" y="14">Billable</text>`;
      svg += `<rect x="${width - 130}" y="22" width="12" height="12" rx="3" fill="${colors['Non-Billable']}" /><text x="${width - 112}" y="32">Non-Billable</text>`;
      return svg;
    };

    charts.forEach((chart) => {
      const card = document.createElement('div');
      card.className = 'card';
      const body = chart.kind === 'pie' ? pie(chart) : stackedBar(chart);
      const viewBox = chart.kind === 'pie' ? '0 0 420 230' : '0 0 420 220';
      card.innerHTML = `<h2>${esc(chart.title)}</h2><svg viewBox="${viewBox}" role="img" aria-label="${esc(chart.title)}">${body}</svg>`;
      container.appendChild(card);
    });
  </script>
</body>
</html>
"#;
