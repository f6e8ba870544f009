/// The single-page form. Every button posts the current inputs and renders
/// the JSON [`Render`](crate::actions::Render) it gets back.
pub const INDEX_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>Student Performance Prediction Dashboard</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 0; display: flex; }
        .sidebar { width: 320px; background: #f8f9fa; padding: 20px; min-height: 100vh; }
        .main { flex: 1; padding: 30px; max-width: 900px; }
        .form-group { margin: 10px 0; }
        label { display: block; margin-bottom: 4px; font-weight: bold; font-size: 0.9em; }
        input[type=range] { width: 80%; }
        select { width: 100%; padding: 6px; }
        button { background: #4CAF50; color: white; padding: 10px 18px; border: none; border-radius: 0.5em; cursor: pointer; margin: 0.5em 0; font-size: 1.05em; }
        button:hover { background: #45a049; }
        .notice { padding: 10px 14px; border-radius: 5px; margin: 6px 0; }
        .success { background: #d4edda; color: #155724; }
        .error { background: #f8d7da; color: #721c24; }
        .info { background: #d1ecf1; color: #0c5460; }
        .status { font-weight: bold; padding: 8px; border-radius: 5px; margin: 10px 0; }
        table { width: 100%; border-collapse: collapse; margin: 12px 0; }
        th, td { padding: 8px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background: #f0f2f6; }
        .columns { display: grid; grid-template-columns: 1fr 1fr; gap: 20px; }
    </style>
</head>
<body>
    <div class="sidebar">
        <h2>Input Student Parameters</h2>
        <button onclick="runAction('POST', '/connect')">Connect to Database</button>
        <div id="status" class="status error">Database: Not Connected</div>
        <hr>

        <h3>Academic Metrics</h3>
        <div id="sliders-academic"></div>
        <h3>Financial Information</h3>
        <div id="sliders-financial"></div>
        <h3>Library Activity</h3>
        <div id="sliders-library"></div>

        <h3>Demographic Information</h3>
        <div class="form-group">
            <label>Gender</label>
            <label><input type="radio" name="gender" value="Female" checked> Female</label>
            <label><input type="radio" name="gender" value="Male"> Male</label>
        </div>
        <div class="form-group">
            <label for="department">Department</label>
            <select id="department">
                <option>Other</option>
                <option>Computer Science</option>
                <option>Electrical Engineering</option>
            </select>
        </div>
        <div class="form-group">
            <label for="parents_education">Parents' Education Level</label>
            <select id="parents_education">
                <option>Other</option>
                <option>Primary</option>
                <option>University</option>
            </select>
        </div>
        <div class="form-group">
            <label>Chronic Illness</label>
            <label><input type="radio" name="chronic_illness" value="No" checked> No</label>
            <label><input type="radio" name="chronic_illness" value="Yes"> Yes</label>
        </div>
    </div>

    <div class="main">
        <h1>Student Performance Prediction Dashboard</h1>
        <p>This app predicts student performance and saves results to the database.</p>

        <h3>User Input Summary</h3>
        <div id="summary"></div>

        <button onclick="runAction('POST', '/predict', true)">Predict &amp; Save to Database</button>
        <div id="notices"></div>

        <div class="columns">
            <div id="prediction"></div>
            <div id="probabilities"></div>
        </div>
        <div id="recent"></div>

        <hr>
        <h3>Database Management</h3>
        <button onclick="runAction('GET', '/connection')">Check Connection Status</button>
        <button onclick="runAction('POST', '/predictions/clear')" style="background: #dc3545;">Clear All Predictions</button>
    </div>

    <script>
        const SLIDERS = {
            'sliders-academic': [
                ['age', 'Age', 15, 30, 20],
                ['year_of_study', 'Year of Study', 1, 5, 2],
                ['attendance', 'Attendance (%)', 0, 100, 75],
                ['assignment_score', 'Assignment Score', 0, 100, 70],
                ['midterm_score', 'Midterm Score', 0, 100, 65],
                ['final_score', 'Final Score', 0, 100, 60],
            ],
            'sliders-financial': [
                ['tuition_paid', 'Tuition Paid (%)', 0, 100, 80],
                ['outstanding_balance', 'Outstanding Balance ($)', 0, 10000, 2000],
            ],
            'sliders-library': [
                ['books_borrowed', 'Books Borrowed', 0, 50, 5],
                ['library_visits', 'Library Visits (per semester)', 0, 100, 10],
                ['days_absent', 'Days Absent', 0, 100, 5],
            ],
        };

        for (const [container, sliders] of Object.entries(SLIDERS)) {
            document.getElementById(container).innerHTML = sliders.map(([id, label, min, max, value]) => `
                <div class="form-group">
                    <label for="${id}">${label}: <span id="${id}-value">${value}</span></label>
                    <input type="range" id="${id}" min="${min}" max="${max}" value="${value}"
                        oninput="document.getElementById('${id}-value').textContent = this.value"
                        onchange="refreshSummary()">
                </div>
            `).join('');
        }
        document.querySelectorAll('input[type=radio], select').forEach(el => el.addEventListener('change', refreshSummary));

        function collectInput() {
            const input = {};
            for (const sliders of Object.values(SLIDERS)) {
                for (const [id] of sliders) {
                    input[id] = parseInt(document.getElementById(id).value, 10);
                }
            }
            input.gender = document.querySelector('input[name=gender]:checked').value;
            input.department = document.getElementById('department').value;
            input.parents_education = document.getElementById('parents_education').value;
            input.chronic_illness = document.querySelector('input[name=chronic_illness]:checked').value;
            return input;
        }

        async function call(method, path, body) {
            const options = { method, headers: {'Content-Type': 'application/json'} };
            if (body !== undefined) options.body = JSON.stringify(body);
            const response = await fetch(path, options);
            return response.json();
        }

        function render(data, clearResults) {
            const status = document.getElementById('status');
            status.className = 'status ' + (data.connected ? 'success' : 'error');
            status.textContent = data.connected ? 'Database: Connected' : 'Database: Not Connected';

            document.getElementById('notices').innerHTML = data.notices
                .map(n => `<div class="notice ${n.level}">${n.message}</div>`).join('');

            if (data.summary) {
                document.getElementById('summary').innerHTML = `
                    <table>
                        <tr>${data.summary.vector.map(f => `<th>${f.name}</th>`).join('')}</tr>
                        <tr>${data.summary.vector.map(f => `<td>${f.value}</td>`).join('')}</tr>
                    </table>`;
            }

            if (clearResults) {
                document.getElementById('prediction').innerHTML = '';
                document.getElementById('probabilities').innerHTML = '';
            }
            if (data.prediction) {
                const high = data.prediction.class_index === 1;
                document.getElementById('prediction').innerHTML = `
                    <h3>Prediction</h3>
                    <div class="notice ${high ? 'success' : 'error'}">${data.prediction.class}</div>`;
                document.getElementById('probabilities').innerHTML = `
                    <h3>Confidence</h3>
                    <table>
                        <tr><th>Performance</th><th>Probability</th></tr>
                        ${data.prediction.probabilities.map(p => `
                            <tr><td>${p.class}</td><td>${(p.probability * 100).toFixed(1)}%</td></tr>`).join('')}
                    </table>`;
            }
            if (data.recent) {
                document.getElementById('recent').innerHTML = data.recent.length === 0 ? '' : `
                    <h3>Recent Predictions</h3>
                    <table>
                        <tr><th>Timestamp</th><th>Age</th><th>Prediction</th><th>Confidence</th></tr>
                        ${data.recent.map(r => `
                            <tr><td>${r.timestamp}</td><td>${r.age}</td><td>${r.prediction}</td>
                                <td>${(r.confidence * 100).toFixed(1)}%</td></tr>`).join('')}
                    </table>`;
            }
        }

        async function runAction(method, path, withInput) {
            try {
                const data = await call(method, path, withInput ? collectInput() : undefined);
                render(data, withInput);
            } catch (error) {
                document.getElementById('notices').innerHTML =
                    `<div class="notice error">Error: ${error.message}</div>`;
            }
        }

        async function refreshSummary() {
            try {
                render(await call('POST', '/input/summary', collectInput()), false);
            } catch (error) {
                document.getElementById('summary').innerHTML = `<p style="color: red;">Error: ${error.message}</p>`;
            }
        }

        refreshSummary();
    </script>
</body>
</html>
"#;
